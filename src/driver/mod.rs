// src/driver/mod.rs

//! The seam between capability handlers and the external camera application.
//!
//! Handlers only ever see [`Surface`]: they locate named controls, read their
//! toggle/selection state, click them and wait for the app to settle. How that
//! is done against a real window is the driver's business.

use crate::error::CapabilityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub mod simulated;
pub use simulated::{CameraState, Fault, SimulatedCamera};

/// On-screen controls the handlers rely on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    StudioEffects,
    BackgroundEffects,
    AutomaticFraming,
    StandardBlur,
    PortraitBlur,
    PortraitLight,
    EyeContact,
    EyeContactStandard,
    EyeContactTeleprompter,
    CreativeFilters,
    IllustratedFilter,
    AnimatedFilter,
    WatercolorFilter,
    VideoQuality,
    ChangeCamera,
    SwitchToPhoto,
    SwitchToVideo,
    TakePhoto,
    TakeVideo,
    BarcodeMode,
    DocumentMode,
    PanoramaMode,
}

impl Control {
    /// Accessible title of the control in the camera app.
    pub fn title(&self) -> &'static str {
        match self {
            Control::StudioEffects => "Windows Studio Effects",
            Control::BackgroundEffects => "Background effects",
            Control::AutomaticFraming => "Automatic framing",
            Control::StandardBlur => "Standard blur",
            Control::PortraitBlur => "Portrait blur",
            Control::PortraitLight => "Portrait light",
            Control::EyeContact => "Eye contact",
            Control::EyeContactStandard => "Standard",
            Control::EyeContactTeleprompter => "Teleprompter",
            Control::CreativeFilters => "Creative filters",
            Control::IllustratedFilter => "Illustrated",
            Control::AnimatedFilter => "Animated",
            Control::WatercolorFilter => "Water color",
            Control::VideoQuality => "Video quality",
            Control::ChangeCamera => "Change camera",
            Control::SwitchToPhoto => "Switch to photo mode",
            Control::SwitchToVideo => "Switch to video mode",
            Control::TakePhoto => "Take photo",
            Control::TakeVideo => "Take video",
            Control::BarcodeMode => "Switch to barcode mode",
            Control::DocumentMode => "Switch to document mode",
            Control::PanoramaMode => "Switch to panorama mode",
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// What locating a control revealed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlInfo {
    pub enabled: bool,
    /// Toggle or selection state; `None` if the control has none or it
    /// could not be read.
    pub toggled: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowState {
    Normal,
    Minimized,
}

impl fmt::Display for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowState::Normal => f.write_str("restored"),
            WindowState::Minimized => f.write_str("minimized"),
        }
    }
}

/// The external camera application. There is exactly one, and it is not
/// reentrant: callers must not interleave mutations.
pub trait Surface: Send + Sync {
    fn is_running(&self) -> bool;
    fn launch(&self) -> Result<(), CapabilityError>;
    fn close(&self) -> Result<(), CapabilityError>;

    /// `None` when the app is not running.
    fn window_state(&self) -> Option<WindowState>;
    fn set_window_state(&self, state: WindowState) -> Result<(), CapabilityError>;

    /// `None` when the control is not present.
    fn find(&self, control: Control) -> Option<ControlInfo>;
    fn click(&self, control: Control) -> Result<(), CapabilityError>;

    /// Entries of a drop-down; `None` when it is not present.
    fn options(&self, control: Control) -> Option<Vec<String>>;
    /// The drop-down's current entry; `None` when it cannot be read.
    fn selected(&self, control: Control) -> Option<String>;
    fn select(&self, control: Control, option: &str) -> Result<(), CapabilityError>;

    /// Give the app time to settle.
    fn wait(&self, duration: Duration);

    /// Locate a control that must be present and enabled.
    fn require(&self, control: Control) -> Result<ControlInfo, CapabilityError> {
        match self.find(control) {
            Some(info) if info.enabled => Ok(info),
            _ => Err(CapabilityError::Unavailable(format!("'{}' button", control.title()))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureMode {
    Photo,
    Video,
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureMode::Photo => f.write_str("photo"),
            CaptureMode::Video => f.write_str("video"),
        }
    }
}

/// Video quality entries the camera app offers, best first.
pub const VIDEO_QUALITIES: &[&str] = &[
    "1440p 16:9 30fps",
    "1440p 4:3 30fps",
    "1080p 16:9 30fps",
    "1080p 4:3 30fps",
    "720p 16:9 30fps",
    "480p 4:3 30fps",
    "360p 16:9 30fps",
];

/// Which physical camera is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    Front,
    Rear,
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facing::Front => f.write_str("front"),
            Facing::Rear => f.write_str("rear"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlurType {
    Standard,
    Portrait,
}

impl BlurType {
    pub fn control(self) -> Control {
        match self {
            BlurType::Standard => Control::StandardBlur,
            BlurType::Portrait => Control::PortraitBlur,
        }
    }
}

impl fmt::Display for BlurType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlurType::Standard => f.write_str("standard"),
            BlurType::Portrait => f.write_str("portrait"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EyeContactStyle {
    Standard,
    Teleprompter,
}

impl EyeContactStyle {
    pub fn control(self) -> Control {
        match self {
            EyeContactStyle::Standard => Control::EyeContactStandard,
            EyeContactStyle::Teleprompter => Control::EyeContactTeleprompter,
        }
    }
}

impl fmt::Display for EyeContactStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EyeContactStyle::Standard => f.write_str("standard"),
            EyeContactStyle::Teleprompter => f.write_str("teleprompter"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreativeFilter {
    Illustrated,
    Animated,
    Watercolor,
}

impl CreativeFilter {
    pub fn control(self) -> Control {
        match self {
            CreativeFilter::Illustrated => Control::IllustratedFilter,
            CreativeFilter::Animated => Control::AnimatedFilter,
            CreativeFilter::Watercolor => Control::WatercolorFilter,
        }
    }
}

impl fmt::Display for CreativeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreativeFilter::Illustrated => f.write_str("illustrated"),
            CreativeFilter::Animated => f.write_str("animated"),
            CreativeFilter::Watercolor => f.write_str("watercolor"),
        }
    }
}
