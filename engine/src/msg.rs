//! Game event messages for the UI layer.

use std::collections::VecDeque;

use crate::MESSAGE_LOG_CAPACITY;

/// Bounded log of message lines.
///
/// A message identical to the previous one is merged into it with a repeat
/// count.
#[derive(Clone, Debug)]
pub struct MessageLog {
    lines: VecDeque<(String, usize)>,
    capacity: usize,
}

impl Default for MessageLog {
    fn default() -> Self {
        MessageLog::new(MESSAGE_LOG_CAPACITY)
    }
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        MessageLog {
            lines: Default::default(),
            capacity,
        }
    }

    pub fn push(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::debug!("msg: {text}");

        if let Some((last, count)) = self.lines.back_mut() {
            if *last == text {
                *count += 1;
                return;
            }
        }

        self.lines.push_back((text, 1));
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Last `n` messages, oldest first.
    pub fn last(&self, n: usize) -> Vec<String> {
        let skip = self.lines.len().saturating_sub(n);
        self.lines
            .iter()
            .skip(skip)
            .map(|(text, count)| {
                if *count > 1 {
                    format!("{text} (x{count})")
                } else {
                    text.clone()
                }
            })
            .collect()
    }
}

/// Format a message into the runtime's message log.
#[macro_export]
macro_rules! msg {
    // NB. Even the simple cases needs to be wrapped in `format!` in case the
    // fmt string is doing named variable capture.
    ($r:expr, $fmt:expr) => {
        $r.log_msg(format!($fmt))
    };

    ($r:expr, $fmt:expr, $($arg:expr),* $(,)?) => {
        $r.log_msg(format!($fmt, $($arg),*))
    };
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn merge_repeats() {
        let mut log = MessageLog::default();
        log.push("The rat bites you.");
        log.push("The rat bites you.");
        log.push("The rat bites you.");
        log.push("You hit the rat.");
        log.push("The rat bites you.");

        assert_eq!(
            log.last(10),
            vec![
                "The rat bites you. (x3)".to_string(),
                "You hit the rat.".to_string(),
                "The rat bites you.".to_string(),
            ]
        );
        assert_eq!(log.last(1), vec!["The rat bites you.".to_string()]);
    }

    #[test]
    fn capacity() {
        let mut log = MessageLog::default();
        for i in 0..(MESSAGE_LOG_CAPACITY + 20) {
            log.push(format!("Message {i}."));
        }
        assert_eq!(log.len(), MESSAGE_LOG_CAPACITY);
        let last = format!("Message {}.", MESSAGE_LOG_CAPACITY + 19);
        assert_eq!(log.last(1), vec![last]);
        assert_eq!(log.last(MESSAGE_LOG_CAPACITY)[0], "Message 20.");
    }
}
