//! Setting dispatch
//!
//! Maps the setting names a router asks for onto the parameter mappers.

use std::fmt;

use super::Adapter;
use super::connection::LineConnection;
use super::diagnostics::Outcome;
use super::error::AdapterError;

/// How a setting is read and written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Gain control addressed by `arg1`, percentages in `arg2`
    Volume,
    /// Boolean control addressed by `arg1`, state in `arg2`
    Toggle,
    /// Boolean control with a fixed name, state in `arg1`
    NamedToggle(&'static str),
    /// Router output addressed by `arg1`, input in `arg2`
    VideoRoute,
}

/// Every setting the adapter understands
pub const SETTINGS: &[(&str, Handler)] = &[
    ("volume", Handler::Volume),
    ("audiomute", Handler::Toggle),
    ("toggle", Handler::Toggle),
    ("voicelift", Handler::NamedToggle("voice_lift")),
    ("autotracking", Handler::NamedToggle("camera_tracking")),
    ("videoroute", Handler::VideoRoute),
];

impl Handler {
    /// Find the handler for a setting name.
    pub fn lookup(setting: &str) -> Option<Handler> {
        SETTINGS
            .iter()
            .find(|(name, _)| *name == setting)
            .map(|(_, handler)| *handler)
    }
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Volume => write!(f, "volume <control> [percent]"),
            Handler::Toggle => write!(f, "toggle <control> [true|false]"),
            Handler::NamedToggle(name) => write!(f, "toggle {name} [true|false]"),
            Handler::VideoRoute => write!(f, "video route <component>_<output> [input]"),
        }
    }
}

impl<C: LineConnection> Adapter<C> {
    /// Read `setting`.
    pub fn get(&mut self, setting: &str, arg1: &str) -> Outcome {
        tracing::debug!(setting, arg1, "get");
        match Handler::lookup(setting) {
            Some(Handler::Volume) => self.get_volume(arg1),
            Some(Handler::Toggle) => self.get_toggle(arg1),
            Some(Handler::NamedToggle(name)) => self.get_toggle(name),
            Some(Handler::VideoRoute) => self.get_video_route(arg1),
            None => self.unrecognized(setting),
        }
    }

    /// Write `setting`.
    pub fn set(&mut self, setting: &str, arg1: &str, arg2: &str) -> Outcome {
        tracing::debug!(setting, arg1, arg2, "set");
        match Handler::lookup(setting) {
            Some(Handler::Volume) => self.set_volume(arg1, arg2),
            Some(Handler::Toggle) => self.set_toggle(arg1, arg2),
            Some(Handler::NamedToggle(name)) => self.set_toggle(name, arg1),
            Some(Handler::VideoRoute) => self.set_video_route(arg1, arg2),
            None => self.unrecognized(setting),
        }
    }

    fn unrecognized(&self, setting: &str) -> Outcome {
        self.reject(AdapterError::UnrecognizedSetting(setting.to_owned()), setting)
    }
}
