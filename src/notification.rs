//! Non-fatal decode diagnostics
//!
//! A decoder that can still produce a usable value records what it had to
//! tolerate instead of failing: an annotation without a color table, an
//! SMP map fitted to a different mesh, a TRK file without a voxel-to-RAS
//! matrix. The records travel on the decoded value and are mirrored to the
//! `log` facade as they are made.
//!
//! ```rust,ignore
//! let layer = surfio::read_layer("lh.aparc.annot", &bytes, mesh.vertex_count())?
//!     .expect("annotation is an overlay format");
//! for note in layer.notifications.of_type(NotificationType::Warning) {
//!     eprintln!("{}", note.message);
//! }
//! ```

use std::fmt;

/// How much a notification matters to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationType {
    /// Part of the file uses a sub-format that is recognized and skipped.
    NotImplemented,
    /// Data present in the file that cannot be attached, such as a TRX
    /// per-vertex array whose length disagrees with the point count.
    NotSupported,
    /// The result is usable but differs from what the header promised.
    Warning,
    /// A trailing section failed to decode; the main payload is intact.
    Error,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotImplemented => "NotImplemented",
            Self::NotSupported => "NotSupported",
            Self::Warning => "Warning",
            Self::Error => "Error",
        }
    }

    /// Level used when mirroring to `log`.
    pub fn log_level(self) -> log::Level {
        match self {
            Self::Warning | Self::Error => log::Level::Warn,
            Self::NotImplemented | Self::NotSupported => log::Level::Debug,
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One diagnostic attached to a decoded mesh, tractogram or layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub notification_type: NotificationType,
    pub message: String,
}

impl Notification {
    pub fn new(notification_type: NotificationType, message: impl Into<String>) -> Self {
        Self {
            notification_type,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.notification_type, self.message)
    }
}

/// Notifications gathered while decoding one file, in the order raised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationCollection {
    items: Vec<Notification>,
}

impl NotificationCollection {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Record a notification and mirror it to the log.
    pub fn notify(&mut self, notification_type: NotificationType, message: impl Into<String>) {
        let notification = Notification::new(notification_type, message);
        log::log!(notification_type.log_level(), "{}", notification);
        self.items.push(notification);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.notify(NotificationType::Warning, message);
    }

    /// Move the notifications of a sub-decoder (a footer, an embedded
    /// color table) into this collection.
    pub fn extend(&mut self, other: NotificationCollection) {
        self.items.extend(other.items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Notification> {
        self.items.iter()
    }

    pub fn of_type(&self, nt: NotificationType) -> impl Iterator<Item = &Notification> + '_ {
        self.items.iter().filter(move |n| n.notification_type == nt)
    }

    pub fn has_type(&self, nt: NotificationType) -> bool {
        self.of_type(nt).next().is_some()
    }

    /// Messages only, for callers that surface them as plain text.
    pub fn messages(&self) -> impl Iterator<Item = &str> + '_ {
        self.items.iter().map(|n| n.message.as_str())
    }
}

impl IntoIterator for NotificationCollection {
    type Item = Notification;
    type IntoIter = std::vec::IntoIter<Notification>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a NotificationCollection {
    type Item = &'a Notification;
    type IntoIter = std::slice::Iter<'a, Notification>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
