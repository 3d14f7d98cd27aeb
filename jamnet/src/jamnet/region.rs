/// Default base frequency in Hz (channel 0)
pub const DEFAULT_BASE_FREQUENCY: u32 = 902_300_000;

/// Default channel spacing in Hz
pub const DEFAULT_CHANNEL_STEP: u32 = 200_000;

/// Default highest usable channel index
pub const DEFAULT_MAX_CHANNEL: u8 = 40;

/// Linear mapping from channel index to carrier frequency
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelPlan {
    /// Frequency of channel 0 in Hz
    pub base_hz: u32,
    /// Spacing between adjacent channels in Hz
    pub step_hz: u32,
    /// Highest valid channel index
    pub max_channel: u8,
}

impl Default for ChannelPlan {
    fn default() -> Self {
        Self {
            base_hz: DEFAULT_BASE_FREQUENCY,
            step_hz: DEFAULT_CHANNEL_STEP,
            max_channel: DEFAULT_MAX_CHANNEL,
        }
    }
}

impl ChannelPlan {
    /// Create a new channel plan with the default US915 sub-band layout
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `channel` is part of this plan
    pub fn contains(&self, channel: u8) -> bool {
        channel <= self.max_channel
    }

    /// Frequency in Hz for `channel`, or `None` when it is out of range
    pub fn frequency(&self, channel: u8) -> Option<u32> {
        if !self.contains(channel) {
            return None;
        }
        self.step_hz
            .checked_mul(channel as u32)
            .and_then(|offset| self.base_hz.checked_add(offset))
    }

    /// Channel after `channel` in scan order, wrapping to 0
    pub fn next_channel(&self, channel: u8) -> u8 {
        if channel >= self.max_channel {
            0
        } else {
            channel + 1
        }
    }
}
