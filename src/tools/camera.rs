// src/tools/camera.rs

//! Reference capabilities for the camera application.
//!
//! Stateful capabilities are thin wrappers over [`reconcile`]/[`toggle`];
//! the two capture capabilities are fire-and-verify.

use crate::context::StepContext;
use crate::driver::{
    BlurType, CaptureMode, Control, CreativeFilter, EyeContactStyle, Facing, Surface, VIDEO_QUALITIES,
    WindowState,
};
use crate::error::{CapabilityError, RegistryError};
use crate::reconcile::{Binary, Outcome, Reading, Reconcile, Settle, Switch, reconcile, require, toggle};
use crate::tools::{Alternative, Capability, CapabilityRegistry, Param, ParamKind};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const BLUR_TYPES: &[Alternative] = &[
    Alternative { name: "standard", aliases: &["std", "normal", "regular"] },
    Alternative { name: "portrait", aliases: &["port"] },
];

pub const FACINGS: &[Alternative] = &[
    Alternative { name: "front", aliases: &["ffc", "front-facing", "selfie", "user"] },
    Alternative { name: "rear", aliases: &["rfc", "rear-facing", "back", "world"] },
];

pub const CAPTURE_MODES: &[Alternative] = &[
    Alternative { name: "photo", aliases: &["photos", "picture", "pictures"] },
    Alternative { name: "video", aliases: &["videos", "recording", "record"] },
];

pub const EYE_CONTACT: &[Alternative] = &[
    Alternative { name: "off", aliases: &["disable", "disabled", "deactivate"] },
    Alternative { name: "standard", aliases: &["std", "on", "enable", "enabled"] },
    Alternative { name: "teleprompter", aliases: &["tele"] },
];

pub const CREATIVE_FILTERS: &[Alternative] = &[
    Alternative { name: "off", aliases: &["none", "disable", "disabled", "deactivate"] },
    Alternative { name: "illustrated", aliases: &["illustration", "ilu"] },
    Alternative { name: "animated", aliases: &["animation", "ani"] },
    Alternative { name: "watercolor", aliases: &["water-color", "water color", "wtr"] },
];

/// Names match [`VIDEO_QUALITIES`]; a bare resolution picks its 16:9 entry.
pub const VIDEO_QUALITY_OPTIONS: &[Alternative] = &[
    Alternative { name: "1440p 16:9 30fps", aliases: &["1440p 16:9", "1440p"] },
    Alternative { name: "1440p 4:3 30fps", aliases: &["1440p 4:3"] },
    Alternative { name: "1080p 16:9 30fps", aliases: &["1080p 16:9", "1080p"] },
    Alternative { name: "1080p 4:3 30fps", aliases: &["1080p 4:3"] },
    Alternative { name: "720p 16:9 30fps", aliases: &["720p 16:9", "720p"] },
    Alternative { name: "480p 4:3 30fps", aliases: &["480p 4:3", "480p"] },
    Alternative { name: "360p 16:9 30fps", aliases: &["360p 16:9", "360p"] },
];

const BLUR_OPTIONS: &[(BlurType, Control)] = &[
    (BlurType::Standard, Control::StandardBlur),
    (BlurType::Portrait, Control::PortraitBlur),
];

const EYE_CONTACT_OPTIONS: &[(EyeContactStyle, Control)] = &[
    (EyeContactStyle::Standard, Control::EyeContactStandard),
    (EyeContactStyle::Teleprompter, Control::EyeContactTeleprompter),
];

const FILTER_OPTIONS: &[(CreativeFilter, Control)] = &[
    (CreativeFilter::Illustrated, Control::IllustratedFilter),
    (CreativeFilter::Animated, Control::AnimatedFilter),
    (CreativeFilter::Watercolor, Control::WatercolorFilter),
];

const DEFAULT_VIDEO_SECONDS: f64 = 3.0;

/// Waits and capture limits applied while driving the app.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timing {
    pub settle: Settle,
    /// After launching the app.
    pub launch: Duration,
    /// After each capture click.
    pub capture: Duration,
    /// Most photos one step may take.
    pub max_photos: u32,
    /// Longest video one step may record.
    pub max_video: Duration,
}

impl Timing {
    pub const IMMEDIATE: Timing = Timing {
        settle: Settle::IMMEDIATE,
        launch: Duration::ZERO,
        capture: Duration::ZERO,
        max_photos: 50,
        max_video: Duration::from_secs(600),
    };
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle: Settle::default(),
            launch: Duration::from_secs(3),
            capture: Duration::from_secs(2),
            max_photos: 50,
            max_video: Duration::from_secs(600),
        }
    }
}

/// Handle shared by every camera capability.
#[derive(Clone)]
pub struct Camera {
    surface: Arc<dyn Surface>,
    timing: Timing,
}

impl Camera {
    pub fn new(surface: Arc<dyn Surface>, timing: Timing) -> Self {
        Self { surface, timing }
    }

    fn require_running(&self) -> Result<(), CapabilityError> {
        if self.surface.is_running() {
            Ok(())
        } else {
            Err(CapabilityError::Precondition("Camera app is not running".into()))
        }
    }

    /// Read a control's toggle state without guessing.
    fn read_toggle(&self, control: Control) -> Reading<Switch> {
        match self.surface.find(control) {
            None => Reading::Unknown(format!("'{}' not found", control.title())),
            Some(info) => match info.toggled {
                Some(on) => Reading::Known(Switch::from(on)),
                None => Reading::Unknown(format!("'{}' toggle state unreadable", control.title())),
            },
        }
    }

    fn click_and_settle(&self, control: Control) -> Result<(), CapabilityError> {
        self.surface.require(control)?;
        self.surface.click(control)
    }

    /// Capture controls are hidden behind an open effects panel.
    fn close_effects_panel(&self) -> Result<(), CapabilityError> {
        if let Some(info) = self.surface.find(Control::StudioEffects) {
            if info.enabled && info.toggled == Some(true) {
                tracing::debug!("closing studio effects panel before capture");
                self.surface.click(Control::StudioEffects)?;
                self.surface.wait(self.timing.settle.interval);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AppState {
    Running,
    Closed,
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppState::Running => f.write_str("running"),
            AppState::Closed => f.write_str("closed"),
        }
    }
}

struct AppTarget<'a>(&'a Camera);

impl Reconcile for AppTarget<'_> {
    type State = AppState;

    fn subject(&self) -> &str {
        "Camera app"
    }

    fn read_state(&self) -> Reading<AppState> {
        Reading::Known(if self.0.surface.is_running() {
            AppState::Running
        } else {
            AppState::Closed
        })
    }

    fn mutate(&self, _current: AppState, desired: AppState) -> Result<(), CapabilityError> {
        match desired {
            AppState::Running => {
                self.0.surface.launch()?;
                self.0.surface.wait(self.0.timing.launch);
                Ok(())
            }
            AppState::Closed => self.0.surface.close(),
        }
    }

    fn pause(&self, duration: Duration) {
        self.0.surface.wait(duration);
    }
}

struct WindowTarget<'a>(&'a Camera);

impl Reconcile for WindowTarget<'_> {
    type State = WindowState;

    fn subject(&self) -> &str {
        "Camera window"
    }

    fn prepare(&self) -> Result<(), CapabilityError> {
        self.0.require_running()
    }

    fn read_state(&self) -> Reading<WindowState> {
        match self.0.surface.window_state() {
            Some(state) => Reading::Known(state),
            None => Reading::Unknown("Camera window not found".into()),
        }
    }

    fn mutate(&self, _current: WindowState, desired: WindowState) -> Result<(), CapabilityError> {
        self.0.surface.set_window_state(desired)
    }

    fn pause(&self, duration: Duration) {
        self.0.surface.wait(duration);
    }
}

struct ModeTarget<'a>(&'a Camera);

impl Reconcile for ModeTarget<'_> {
    type State = CaptureMode;

    fn subject(&self) -> &str {
        "Camera mode"
    }

    fn prepare(&self) -> Result<(), CapabilityError> {
        self.0.require_running()
    }

    fn read_state(&self) -> Reading<CaptureMode> {
        let surface = &self.0.surface;
        if surface.find(Control::TakeVideo).is_some() {
            Reading::Known(CaptureMode::Video)
        } else if surface.find(Control::TakePhoto).is_some() {
            Reading::Known(CaptureMode::Photo)
        } else {
            Reading::Unknown("no capture button found".into())
        }
    }

    fn mutate(&self, _current: CaptureMode, desired: CaptureMode) -> Result<(), CapabilityError> {
        match desired {
            CaptureMode::Photo => self.0.click_and_settle(Control::SwitchToPhoto),
            CaptureMode::Video => self.0.click_and_settle(Control::SwitchToVideo),
        }
    }

    fn pause(&self, duration: Duration) {
        self.0.surface.wait(duration);
    }
}

struct FacingTarget<'a>(&'a Camera);

impl Reconcile for FacingTarget<'_> {
    type State = Facing;

    fn subject(&self) -> &str {
        "Active camera"
    }

    fn prepare(&self) -> Result<(), CapabilityError> {
        self.0.require_running()
    }

    /// Front and rear cameras expose different mode buttons.
    fn read_state(&self) -> Reading<Facing> {
        let surface = &self.0.surface;
        if surface.find(Control::TakeVideo).is_some() {
            if surface.find(Control::StudioEffects).is_some_and(|i| i.enabled) {
                return Reading::Known(Facing::Front);
            }
            if surface.find(Control::PanoramaMode).is_some() {
                return Reading::Known(Facing::Rear);
            }
            Reading::Unknown("camera in video mode but type cannot be determined".into())
        } else {
            if surface.find(Control::BarcodeMode).is_some() {
                return Reading::Known(Facing::Front);
            }
            if surface.find(Control::DocumentMode).is_some() {
                return Reading::Known(Facing::Rear);
            }
            Reading::Unknown("no identifying buttons found".into())
        }
    }

    fn mutate(&self, _current: Facing, _desired: Facing) -> Result<(), CapabilityError> {
        self.0.click_and_settle(Control::ChangeCamera)
    }

    fn pause(&self, duration: Duration) {
        self.0.surface.wait(duration);
    }
}

struct PanelTarget<'a>(&'a Camera);

impl Reconcile for PanelTarget<'_> {
    type State = Switch;

    fn subject(&self) -> &str {
        "Windows Studio Effects panel"
    }

    /// The panel only exists for the front camera in video mode.
    fn prepare(&self) -> Result<(), CapabilityError> {
        self.0.require_running()?;
        let settle = self.0.timing.settle;
        require(&FacingTarget(self.0), Facing::Front, settle)?;
        require(&ModeTarget(self.0), CaptureMode::Video, settle)
    }

    fn read_state(&self) -> Reading<Switch> {
        self.0.read_toggle(Control::StudioEffects)
    }

    fn mutate(&self, _current: Switch, _desired: Switch) -> Result<(), CapabilityError> {
        self.0.click_and_settle(Control::StudioEffects)
    }

    fn pause(&self, duration: Duration) {
        self.0.surface.wait(duration);
    }
}

struct EffectSwitch<'a> {
    camera: &'a Camera,
    control: Control,
}

impl Reconcile for EffectSwitch<'_> {
    type State = Switch;

    fn subject(&self) -> &str {
        self.control.title()
    }

    fn prepare(&self) -> Result<(), CapabilityError> {
        require(&PanelTarget(self.camera), Switch::On, self.camera.timing.settle)
    }

    fn read_state(&self) -> Reading<Switch> {
        self.camera.read_toggle(self.control)
    }

    fn mutate(&self, _current: Switch, _desired: Switch) -> Result<(), CapabilityError> {
        self.camera.click_and_settle(self.control)
    }

    fn pause(&self, duration: Duration) {
        self.camera.surface.wait(duration);
    }
}

/// Radio options shown while the `parent` switch is on.
struct RadioTarget<'a, S: 'static> {
    camera: &'a Camera,
    subject: &'static str,
    parent: Control,
    options: &'static [(S, Control)],
}

impl<S> Reconcile for RadioTarget<'_, S>
where
    S: Copy + PartialEq + fmt::Display + 'static,
{
    type State = S;

    fn subject(&self) -> &str {
        self.subject
    }

    fn prepare(&self) -> Result<(), CapabilityError> {
        let parent = EffectSwitch {
            camera: self.camera,
            control: self.parent,
        };
        require(&parent, Switch::On, self.camera.timing.settle)
    }

    /// Exactly one option must read as selected.
    fn read_state(&self) -> Reading<S> {
        let mut selected = self.options.iter().filter(|(_, control)| {
            self.camera.surface.find(*control).and_then(|info| info.toggled) == Some(true)
        });
        match (selected.next(), selected.next()) {
            (Some((state, _)), None) => Reading::Known(*state),
            (None, _) => Reading::Unknown(format!("no {} option selected", self.subject.to_lowercase())),
            (Some(_), Some(_)) => Reading::Unknown(format!(
                "several {} options selected",
                self.subject.to_lowercase()
            )),
        }
    }

    fn mutate(&self, _current: S, desired: S) -> Result<(), CapabilityError> {
        let control = self
            .options
            .iter()
            .find(|(state, _)| *state == desired)
            .map(|(_, control)| *control)
            .ok_or_else(|| CapabilityError::InvalidArgument(format!("no option for {desired}")))?;
        self.camera.click_and_settle(control)
    }

    fn pause(&self, duration: Duration) {
        self.camera.surface.wait(duration);
    }
}

fn blur_target(camera: &Camera) -> RadioTarget<'_, BlurType> {
    RadioTarget {
        camera,
        subject: "Blur type",
        parent: Control::BackgroundEffects,
        options: BLUR_OPTIONS,
    }
}

struct QualityTarget<'a>(&'a Camera);

impl Reconcile for QualityTarget<'_> {
    type State = &'static str;

    fn subject(&self) -> &str {
        "Video quality"
    }

    fn prepare(&self) -> Result<(), CapabilityError> {
        self.0.require_running()
    }

    fn read_state(&self) -> Reading<&'static str> {
        match self.0.surface.selected(Control::VideoQuality) {
            None => Reading::Unknown("'Video quality' selection unreadable".into()),
            Some(current) => match VIDEO_QUALITIES.iter().copied().find(|q| *q == current) {
                Some(quality) => Reading::Known(quality),
                None => Reading::Unknown(format!("unrecognised video quality '{current}'")),
            },
        }
    }

    fn mutate(&self, _current: &'static str, desired: &'static str) -> Result<(), CapabilityError> {
        let offered = self
            .0
            .surface
            .options(Control::VideoQuality)
            .ok_or_else(|| CapabilityError::Unavailable("'Video quality' drop-down".into()))?;
        if !offered.iter().any(|o| o == desired) {
            return Err(CapabilityError::Unavailable(format!("video quality '{desired}'")));
        }
        self.0.surface.select(Control::VideoQuality, desired)
    }

    fn pause(&self, duration: Duration) {
        self.0.surface.wait(duration);
    }
}

/// What a step asked of a stateful capability.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Desired<S> {
    Set(S),
    Toggle,
}

fn unstated(subject: &str) -> CapabilityError {
    CapabilityError::InvalidArgument(format!("no desired state stated for {subject}"))
}

/// Reconcile to the stated state, or flip it when the step asked for that.
fn set_or_toggle<R>(target: &R, desired: Desired<R::State>, settle: Settle) -> Result<String, CapabilityError>
where
    R: Reconcile,
    R::State: Binary,
{
    let outcome = match desired {
        Desired::Set(state) => reconcile(target, state, settle)?,
        Desired::Toggle => toggle(target, settle)?,
    };
    Ok(outcome.describe(target.subject()))
}

/// Settings with more than two values cannot be flipped.
fn exact<T>(desired: Desired<T>, subject: &str) -> Result<T, CapabilityError> {
    match desired {
        Desired::Set(value) => Ok(value),
        Desired::Toggle => Err(CapabilityError::InvalidArgument(format!(
            "{subject} has more than two settings; name the one wanted"
        ))),
    }
}

fn flag(param: Option<Param>, subject: &str) -> Result<Desired<Switch>, CapabilityError> {
    match param {
        Some(Param::Flag(on)) => Ok(Desired::Set(Switch::from(on))),
        Some(Param::Toggle) => Ok(Desired::Toggle),
        None => Err(unstated(subject)),
        Some(other) => Err(CapabilityError::InvalidArgument(format!(
            "expected ON or OFF, got {other}"
        ))),
    }
}

fn choice<T>(
    param: Option<Param>,
    subject: &str,
    pick: impl Fn(&str) -> Option<T>,
) -> Result<Desired<T>, CapabilityError> {
    match param {
        Some(Param::Choice(name)) => pick(name)
            .map(Desired::Set)
            .ok_or_else(|| CapabilityError::InvalidArgument(format!("unknown option: {name}"))),
        Some(Param::Toggle) => Ok(Desired::Toggle),
        None => Err(unstated(subject)),
        Some(other) => Err(CapabilityError::InvalidArgument(format!(
            "unexpected argument: {other}"
        ))),
    }
}

/// Switch the radio group's parent off, or on with `style` selected.
fn set_styled_effect<S>(radio: &RadioTarget<'_, S>, style: Option<S>) -> Result<String, CapabilityError>
where
    S: Copy + PartialEq + fmt::Display + 'static,
{
    let settle = radio.camera.timing.settle;
    let switch = EffectSwitch {
        camera: radio.camera,
        control: radio.parent,
    };
    let Some(style) = style else {
        return Ok(reconcile(&switch, Switch::Off, settle)?.describe(switch.subject()));
    };

    let switched_on = reconcile(&switch, Switch::On, settle)?.is_changed();
    let outcome = match reconcile(radio, style, settle)? {
        Outcome::Unchanged(current) if switched_on => Outcome::Changed {
            from: current,
            to: current,
        },
        other => other,
    };
    Ok(outcome.describe(radio.subject()))
}

pub struct OpenCamera(pub Camera);

impl Capability for OpenCamera {
    fn name(&self) -> &str {
        "open_camera"
    }

    fn description(&self) -> &str {
        "Open the camera"
    }

    fn invoke(&self, _param: Option<Param>, _ctx: &StepContext) -> Result<String, CapabilityError> {
        match reconcile(&AppTarget(&self.0), AppState::Running, self.0.timing.settle)? {
            Outcome::Unchanged(_) => Ok("Camera app is already running.".into()),
            Outcome::Changed { .. } => Ok("Camera app opened successfully.".into()),
        }
    }
}

pub struct CloseCamera(pub Camera);

impl Capability for CloseCamera {
    fn name(&self) -> &str {
        "close_camera"
    }

    fn description(&self) -> &str {
        "Close the camera"
    }

    fn invoke(&self, _param: Option<Param>, _ctx: &StepContext) -> Result<String, CapabilityError> {
        match reconcile(&AppTarget(&self.0), AppState::Closed, self.0.timing.settle)? {
            Outcome::Unchanged(_) => Ok("Camera app is already closed.".into()),
            Outcome::Changed { .. } => Ok("Camera app closed successfully.".into()),
        }
    }
}

pub struct MinimizeCamera(pub Camera);

impl Capability for MinimizeCamera {
    fn name(&self) -> &str {
        "minimize_camera"
    }

    fn description(&self) -> &str {
        "Minimize the camera"
    }

    fn invoke(&self, _param: Option<Param>, _ctx: &StepContext) -> Result<String, CapabilityError> {
        match reconcile(&WindowTarget(&self.0), WindowState::Minimized, self.0.timing.settle)? {
            Outcome::Unchanged(_) => Ok("Camera app is already minimized.".into()),
            Outcome::Changed { .. } => Ok("Camera app minimized successfully.".into()),
        }
    }
}

pub struct RestoreCamera(pub Camera);

impl Capability for RestoreCamera {
    fn name(&self) -> &str {
        "restore_camera"
    }

    fn description(&self) -> &str {
        "Restore the camera"
    }

    fn invoke(&self, _param: Option<Param>, _ctx: &StepContext) -> Result<String, CapabilityError> {
        match reconcile(&WindowTarget(&self.0), WindowState::Normal, self.0.timing.settle)? {
            Outcome::Unchanged(_) => Ok("Camera app is already restored.".into()),
            Outcome::Changed { .. } => Ok("Camera app restored successfully.".into()),
        }
    }
}

pub struct SetAutomaticFraming(pub Camera);

impl Capability for SetAutomaticFraming {
    fn name(&self) -> &str {
        "set_automatic_framing"
    }

    fn description(&self) -> &str {
        "Set automatic framing to on or off"
    }

    fn param(&self) -> ParamKind {
        ParamKind::Flag
    }

    fn keywords(&self) -> &[&'static str] {
        &["framing", "auto-framing", "autoframing"]
    }

    fn invoke(&self, param: Option<Param>, _ctx: &StepContext) -> Result<String, CapabilityError> {
        let target = EffectSwitch {
            camera: &self.0,
            control: Control::AutomaticFraming,
        };
        set_or_toggle(&target, flag(param, target.subject())?, self.0.timing.settle)
    }
}

pub struct SetBackgroundEffects(pub Camera);

impl Capability for SetBackgroundEffects {
    fn name(&self) -> &str {
        "set_background_effects"
    }

    fn description(&self) -> &str {
        "Set background effects to on or off"
    }

    fn param(&self) -> ParamKind {
        ParamKind::Flag
    }

    fn keywords(&self) -> &[&'static str] {
        &["background"]
    }

    fn invoke(&self, param: Option<Param>, _ctx: &StepContext) -> Result<String, CapabilityError> {
        let target = EffectSwitch {
            camera: &self.0,
            control: Control::BackgroundEffects,
        };
        set_or_toggle(&target, flag(param, target.subject())?, self.0.timing.settle)
    }
}

pub struct SetBlurType(pub Camera);

impl Capability for SetBlurType {
    fn name(&self) -> &str {
        "set_blur_type"
    }

    fn description(&self) -> &str {
        "Set blur type to standard or portrait"
    }

    fn param(&self) -> ParamKind {
        ParamKind::Choice(BLUR_TYPES)
    }

    fn keywords(&self) -> &[&'static str] {
        &["blur"]
    }

    fn invoke(&self, param: Option<Param>, _ctx: &StepContext) -> Result<String, CapabilityError> {
        let target = blur_target(&self.0);
        let desired = choice(param, target.subject(), |name| match name {
            "standard" => Some(BlurType::Standard),
            "portrait" => Some(BlurType::Portrait),
            _ => None,
        })?;
        set_or_toggle(&target, desired, self.0.timing.settle)
    }
}

pub struct SwitchCamera(pub Camera);

impl Capability for SwitchCamera {
    fn name(&self) -> &str {
        "switch_camera"
    }

    fn description(&self) -> &str {
        "Switch between front and rear cameras"
    }

    fn param(&self) -> ParamKind {
        ParamKind::Choice(FACINGS)
    }

    fn keywords(&self) -> &[&'static str] {
        &["camera", "cameras"]
    }

    fn invoke(&self, param: Option<Param>, _ctx: &StepContext) -> Result<String, CapabilityError> {
        let target = FacingTarget(&self.0);
        let desired = choice(param, target.subject(), |name| match name {
            "front" => Some(Facing::Front),
            "rear" => Some(Facing::Rear),
            _ => None,
        })?;
        set_or_toggle(&target, desired, self.0.timing.settle)
    }
}

pub struct SetCameraMode(pub Camera);

impl Capability for SetCameraMode {
    fn name(&self) -> &str {
        "camera_mode"
    }

    fn description(&self) -> &str {
        "Switch between photo and video mode"
    }

    fn param(&self) -> ParamKind {
        ParamKind::Choice(CAPTURE_MODES)
    }

    fn keywords(&self) -> &[&'static str] {
        &["mode"]
    }

    fn invoke(&self, param: Option<Param>, _ctx: &StepContext) -> Result<String, CapabilityError> {
        let target = ModeTarget(&self.0);
        let desired = choice(param, target.subject(), |name| match name {
            "photo" => Some(CaptureMode::Photo),
            "video" => Some(CaptureMode::Video),
            _ => None,
        })?;
        set_or_toggle(&target, desired, self.0.timing.settle)
    }
}

pub struct SetPortraitLight(pub Camera);

impl Capability for SetPortraitLight {
    fn name(&self) -> &str {
        "set_portrait_light"
    }

    fn description(&self) -> &str {
        "Set portrait light to on or off"
    }

    fn param(&self) -> ParamKind {
        ParamKind::Flag
    }

    fn keywords(&self) -> &[&'static str] {
        &["light", "lighting"]
    }

    fn invoke(&self, param: Option<Param>, _ctx: &StepContext) -> Result<String, CapabilityError> {
        let target = EffectSwitch {
            camera: &self.0,
            control: Control::PortraitLight,
        };
        set_or_toggle(&target, flag(param, target.subject())?, self.0.timing.settle)
    }
}

pub struct SetEyeContact(pub Camera);

impl Capability for SetEyeContact {
    fn name(&self) -> &str {
        "set_eye_contact"
    }

    fn description(&self) -> &str {
        "Turn eye contact off, or on in standard or teleprompter style"
    }

    fn param(&self) -> ParamKind {
        ParamKind::Choice(EYE_CONTACT)
    }

    fn keywords(&self) -> &[&'static str] {
        &["eye", "contact"]
    }

    fn invoke(&self, param: Option<Param>, _ctx: &StepContext) -> Result<String, CapabilityError> {
        let target = RadioTarget {
            camera: &self.0,
            subject: "Eye contact",
            parent: Control::EyeContact,
            options: EYE_CONTACT_OPTIONS,
        };
        let desired = choice(param, target.subject, |name| match name {
            "off" => Some(None),
            "standard" => Some(Some(EyeContactStyle::Standard)),
            "teleprompter" => Some(Some(EyeContactStyle::Teleprompter)),
            _ => None,
        })?;
        set_styled_effect(&target, exact(desired, target.subject)?)
    }
}

pub struct SetCreativeFilter(pub Camera);

impl Capability for SetCreativeFilter {
    fn name(&self) -> &str {
        "set_creative_filter"
    }

    fn description(&self) -> &str {
        "Turn creative filters off, or on with the illustrated, animated or watercolor filter"
    }

    fn param(&self) -> ParamKind {
        ParamKind::Choice(CREATIVE_FILTERS)
    }

    fn keywords(&self) -> &[&'static str] {
        &["filter", "filters", "creative"]
    }

    fn invoke(&self, param: Option<Param>, _ctx: &StepContext) -> Result<String, CapabilityError> {
        let target = RadioTarget {
            camera: &self.0,
            subject: "Creative filter",
            parent: Control::CreativeFilters,
            options: FILTER_OPTIONS,
        };
        let desired = choice(param, target.subject, |name| match name {
            "off" => Some(None),
            "illustrated" => Some(Some(CreativeFilter::Illustrated)),
            "animated" => Some(Some(CreativeFilter::Animated)),
            "watercolor" => Some(Some(CreativeFilter::Watercolor)),
            _ => None,
        })?;
        set_styled_effect(&target, exact(desired, target.subject)?)
    }
}

pub struct SetVideoQuality(pub Camera);

impl Capability for SetVideoQuality {
    fn name(&self) -> &str {
        "set_video_quality"
    }

    fn description(&self) -> &str {
        "Set the video recording quality"
    }

    fn param(&self) -> ParamKind {
        ParamKind::Choice(VIDEO_QUALITY_OPTIONS)
    }

    fn keywords(&self) -> &[&'static str] {
        &["quality", "resolution"]
    }

    fn invoke(&self, param: Option<Param>, _ctx: &StepContext) -> Result<String, CapabilityError> {
        let target = QualityTarget(&self.0);
        let desired = choice(param, target.subject(), |name| {
            VIDEO_QUALITIES.iter().copied().find(|q| *q == name)
        })?;
        let quality = exact(desired, target.subject())?;
        Ok(reconcile(&target, quality, self.0.timing.settle)?.describe(target.subject()))
    }
}

pub struct GetVideoQualityOptions(pub Camera);

impl Capability for GetVideoQualityOptions {
    fn name(&self) -> &str {
        "get_video_quality_options"
    }

    fn description(&self) -> &str {
        "List the video qualities the camera offers"
    }

    fn invoke(&self, _param: Option<Param>, _ctx: &StepContext) -> Result<String, CapabilityError> {
        self.0.require_running()?;
        let options = self
            .0
            .surface
            .options(Control::VideoQuality)
            .ok_or_else(|| CapabilityError::Unavailable("'Video quality' drop-down".into()))?;
        Ok(format!("Available video qualities: {}.", options.join(", ")))
    }
}

pub struct TakePhoto(pub Camera);

impl Capability for TakePhoto {
    fn name(&self) -> &str {
        "take_photo"
    }

    fn description(&self) -> &str {
        "Take one or more photos"
    }

    fn param(&self) -> ParamKind {
        ParamKind::Count { default: 1 }
    }

    fn invoke(&self, param: Option<Param>, _ctx: &StepContext) -> Result<String, CapabilityError> {
        let max = self.0.timing.max_photos;
        let count = match param {
            None => 1,
            Some(Param::Count(n)) if n > max => {
                return Err(CapabilityError::InvalidArgument(format!(
                    "{n} photos exceeds the limit of {max}"
                )));
            }
            Some(Param::Count(n)) if n > 0 => n,
            Some(other) => {
                return Err(CapabilityError::InvalidArgument(format!(
                    "expected a photo count, got {other}"
                )));
            }
        };

        let camera = &self.0;
        camera.close_effects_panel()?;
        require(&ModeTarget(camera), CaptureMode::Photo, camera.timing.settle)?;
        camera.surface.require(Control::TakePhoto)?;

        for i in 0..count {
            camera.surface.click(Control::TakePhoto)?;
            camera.surface.wait(camera.timing.capture);
            tracing::debug!("photo {}/{} taken", i + 1, count);
        }

        if camera.surface.require(Control::TakePhoto).is_err() {
            return Err(CapabilityError::Unavailable(
                "'Take photo' button after capture".into(),
            ));
        }

        Ok(format!(
            "{count} photo{} taken successfully.",
            if count > 1 { "s" } else { "" }
        ))
    }
}

pub struct TakeVideo(pub Camera);

impl Capability for TakeVideo {
    fn name(&self) -> &str {
        "take_video"
    }

    fn description(&self) -> &str {
        "Record a video for a number of seconds"
    }

    fn param(&self) -> ParamKind {
        ParamKind::Seconds {
            default: DEFAULT_VIDEO_SECONDS,
        }
    }

    fn invoke(&self, param: Option<Param>, _ctx: &StepContext) -> Result<String, CapabilityError> {
        let seconds = match param {
            None => DEFAULT_VIDEO_SECONDS,
            Some(Param::Seconds(s)) => s,
            Some(other) => {
                return Err(CapabilityError::InvalidArgument(format!(
                    "expected a duration, got {other}"
                )));
            }
        };
        let duration = Duration::try_from_secs_f64(seconds)
            .map_err(|_| CapabilityError::InvalidArgument(format!("invalid duration: {seconds}")))?;
        let max = self.0.timing.max_video;
        if duration > max {
            return Err(CapabilityError::InvalidArgument(format!(
                "{seconds}s exceeds the limit of {}s",
                max.as_secs_f64()
            )));
        }

        let camera = &self.0;
        camera.close_effects_panel()?;
        require(&ModeTarget(camera), CaptureMode::Video, camera.timing.settle)?;

        camera.surface.require(Control::TakeVideo)?;
        camera.surface.click(Control::TakeVideo)?;
        if camera.read_toggle(Control::TakeVideo) == Reading::Known(Switch::Off) {
            return Err(CapabilityError::Reconciliation {
                control: "Recording".into(),
                desired: "started".into(),
                observed: "stopped".into(),
            });
        }

        tracing::info!(seconds, "recording video");
        camera.surface.wait(duration);

        if camera.surface.require(Control::TakeVideo).is_err() {
            return Err(CapabilityError::Unavailable("stop recording button".into()));
        }
        camera.surface.click(Control::TakeVideo)?;
        camera.surface.wait(camera.timing.capture);

        if camera.read_toggle(Control::TakeVideo) == Reading::Known(Switch::On) {
            return Err(CapabilityError::Reconciliation {
                control: "Recording".into(),
                desired: "stopped".into(),
                observed: "still recording".into(),
            });
        }

        Ok(format!("Video recorded successfully ({seconds}s)."))
    }
}

/// Register the full camera capability set, in catalog order.
pub fn register_all(registry: &mut CapabilityRegistry, camera: &Camera) -> Result<(), RegistryError> {
    registry.register(OpenCamera(camera.clone()))?;
    registry.register(CloseCamera(camera.clone()))?;
    registry.register(MinimizeCamera(camera.clone()))?;
    registry.register(RestoreCamera(camera.clone()))?;
    registry.register(SetAutomaticFraming(camera.clone()))?;
    registry.register(SetBlurType(camera.clone()))?;
    registry.register(SetBackgroundEffects(camera.clone()))?;
    registry.register(SwitchCamera(camera.clone()))?;
    registry.register(SetCameraMode(camera.clone()))?;
    registry.register(SetPortraitLight(camera.clone()))?;
    registry.register(SetEyeContact(camera.clone()))?;
    registry.register(SetCreativeFilter(camera.clone()))?;
    registry.register(SetVideoQuality(camera.clone()))?;
    registry.register(GetVideoQualityOptions(camera.clone()))?;
    registry.register(TakePhoto(camera.clone()))?;
    registry.register(TakeVideo(camera.clone()))?;
    Ok(())
}

pub fn camera_registry(surface: Arc<dyn Surface>, timing: Timing) -> Result<CapabilityRegistry, RegistryError> {
    let mut registry = CapabilityRegistry::new();
    register_all(&mut registry, &Camera::new(surface, timing))?;
    Ok(registry)
}
