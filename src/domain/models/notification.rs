#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NotificationLevel {
    Warning,
    Error,
}

/// Transient notice shown once to the user and then discarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn warning(message: &str) -> Notification {
        return Notification {
            level: NotificationLevel::Warning,
            message: message.to_string(),
        };
    }

    pub fn error(message: &str) -> Notification {
        return Notification {
            level: NotificationLevel::Error,
            message: message.to_string(),
        };
    }
}
