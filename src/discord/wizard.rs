//! Setup wizard state machine.
//!
//! Welcome -> SelectModChannel -> SelectSyncChannel -> Confirmed. Each step
//! that selects a channel only lets the admin advance once a channel is
//! chosen. Rendering and persistence live in `setup`.

use thiserror::Error;

use crate::common::ChannelRef;
use crate::store::DestinationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Welcome,
    SelectModChannel,
    SelectSyncChannel,
    Confirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardEvent {
    Next,
    ChannelSelected(ChannelRef),
}

/// A selection that must be written to the store right away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelChoice {
    Moderation(ChannelRef),
    Sync(ChannelRef),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("select a channel before continuing")]
    ChannelRequired,
    #[error("this step does not take a channel")]
    UnexpectedSelection,
    #[error("setup is already complete")]
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupWizard {
    step: WizardStep,
    mod_channel: Option<ChannelRef>,
    sync_channel: Option<ChannelRef>,
}

impl Default for SetupWizard {
    fn default() -> Self {
        Self {
            step: WizardStep::Welcome,
            mod_channel: None,
            sync_channel: None,
        }
    }
}

impl SetupWizard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration; earlier choices count as made.
    pub fn from_config(config: &DestinationConfig) -> Self {
        Self {
            step: WizardStep::Welcome,
            mod_channel: config.mod_channel_id,
            sync_channel: config.global_chat_channel_id,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn mod_channel(&self) -> Option<ChannelRef> {
        self.mod_channel
    }

    pub fn sync_channel(&self) -> Option<ChannelRef> {
        self.sync_channel
    }

    /// Whether `Next` would be accepted right now.
    pub fn can_advance(&self) -> bool {
        match self.step {
            WizardStep::Welcome => true,
            WizardStep::SelectModChannel => self.mod_channel.is_some(),
            WizardStep::SelectSyncChannel => self.sync_channel.is_some(),
            WizardStep::Confirmed => false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.step == WizardStep::Confirmed
    }

    /// Apply an event. A rejected event leaves the wizard unchanged.
    pub fn apply(&mut self, event: WizardEvent) -> Result<Option<ChannelChoice>, WizardError> {
        match (self.step, event) {
            (WizardStep::Confirmed, _) => Err(WizardError::Finished),

            (_, WizardEvent::Next) if !self.can_advance() => Err(WizardError::ChannelRequired),
            (WizardStep::Welcome, WizardEvent::Next) => {
                self.step = WizardStep::SelectModChannel;
                Ok(None)
            }
            (WizardStep::SelectModChannel, WizardEvent::Next) => {
                self.step = WizardStep::SelectSyncChannel;
                Ok(None)
            }
            (WizardStep::SelectSyncChannel, WizardEvent::Next) => {
                self.step = WizardStep::Confirmed;
                Ok(None)
            }

            (WizardStep::SelectModChannel, WizardEvent::ChannelSelected(channel)) => {
                self.mod_channel = Some(channel);
                Ok(Some(ChannelChoice::Moderation(channel)))
            }
            (WizardStep::SelectSyncChannel, WizardEvent::ChannelSelected(channel)) => {
                self.sync_channel = Some(channel);
                Ok(Some(ChannelChoice::Sync(channel)))
            }
            (WizardStep::Welcome, WizardEvent::ChannelSelected(_)) => {
                Err(WizardError::UnexpectedSelection)
            }
        }
    }
}
