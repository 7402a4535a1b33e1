//! Fixed moderation lists.
//!
//! These are policy, not heuristics: what gets blocked (and which innocent
//! words get caught along the way) is decided entirely by these lists.

/// Words blocked on an exact token match, and as substrings of normalized text.
pub const BLOCKED_WORDS: &[&str] = &[
    "nigger", "nigga", "nig", "niger", "n1gger", "n1gga",
    "fuck", "fucker", "fucking", "fck", "fuk",
    "shit", "shitty", "sh1t",
    "cunt", "cunts",
    "fag", "faggot", "fags",
    "retard", "retarded",
    "kys", "nazi", "hitler", "kkk",
];

/// Character-class spellings matched case-insensitively against raw and
/// normalized text. Only bounded classes and literals; no nested repetition.
pub const BLOCKED_PATTERNS: &[&str] = &[
    r"n[i!1|l][g9][g9][e3]r",
    r"n[i!1|l][g9]{2}[a@4]",
    r"n[i!1|l][g9][a@4]",
    r"n[i!1|l]gg",
    r"f[u\*@][c\(k]",
    r"sh[i!1][t\+]",
    r"f[a@4][g9]{2}[o0]t",
    r"f[a@4][g9]",
    r"r[e3]t[a@4]rd",
    r"c[u\*][n\*]t",
    r"b[i!1]tch",
    r"k[i!1]ll[\s]*y[o0]urs[e3]lf",
    r"kys",
];
