// src/hal/channel_map.rs
//! Mapping board channels onto the configured channel count

use tracing::warn;

/// Board channel `i % board_channels` feeds pipeline channel `i`
pub fn remap_channels(channels: Vec<Vec<f64>>, target: usize) -> Vec<Vec<f64>> {
    let available = channels.len();
    if available == target || available == 0 {
        return channels;
    }
    if available > target {
        let mut channels = channels;
        channels.truncate(target);
        return channels;
    }
    (0..target).map(|i| channels[i % available].clone()).collect()
}

/// Fixed board-to-pipeline mapping, warned about once at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMap {
    board_channels: usize,
    target_channels: usize,
}

impl ChannelMap {
    pub fn new(board_channels: usize, target_channels: usize) -> Self {
        if board_channels < target_channels {
            warn!(
                board_channels,
                target_channels,
                "Board has fewer channels than configured; repeating board channels"
            );
        } else if board_channels > target_channels {
            warn!(
                board_channels,
                target_channels,
                "Board has more channels than configured; extra channels dropped"
            );
        }
        Self {
            board_channels,
            target_channels,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.board_channels == self.target_channels
    }

    pub fn target_channels(&self) -> usize {
        self.target_channels
    }

    pub fn apply(&self, channels: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
        if self.is_identity() {
            channels
        } else {
            remap_channels(channels, self.target_channels)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_when_board_is_smaller() {
        let remapped = remap_channels(vec![vec![1.0], vec![2.0], vec![3.0]], 8);
        let firsts: Vec<f64> = remapped.iter().map(|c| c[0]).collect();
        assert_eq!(firsts, vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_truncate_when_board_is_larger() {
        let remapped = remap_channels(vec![vec![0.0]; 16], 8);
        assert_eq!(remapped.len(), 8);
    }

    #[test]
    fn test_channel_map() {
        let map = ChannelMap::new(4, 4);
        assert!(map.is_identity());

        let map = ChannelMap::new(2, 4);
        assert_eq!(map.apply(vec![vec![1.0], vec![2.0]]).len(), 4);
        assert_eq!(map.target_channels(), 4);
    }
}
