// src/driver/simulated.rs

use crate::driver::{
    BlurType, CaptureMode, Control, ControlInfo, CreativeFilter, EyeContactStyle, Facing, Surface,
    VIDEO_QUALITIES, WindowState,
};
use crate::error::CapabilityError;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Everything the simulated app remembers.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraState {
    pub running: bool,
    pub window: WindowState,
    pub mode: CaptureMode,
    pub facing: Facing,
    pub effects_panel_open: bool,
    pub background_effects: bool,
    pub automatic_framing: bool,
    pub blur: BlurType,
    pub portrait_light: bool,
    pub eye_contact: bool,
    pub eye_contact_style: EyeContactStyle,
    pub creative_filters: bool,
    pub creative_filter: CreativeFilter,
    /// Entries of the video quality drop-down.
    pub video_qualities: Vec<String>,
    pub video_quality: String,
    pub recording: bool,
    pub photos_taken: u32,
    pub videos_taken: u32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            running: false,
            window: WindowState::Normal,
            mode: CaptureMode::Photo,
            facing: Facing::Front,
            effects_panel_open: false,
            background_effects: false,
            automatic_framing: false,
            blur: BlurType::Standard,
            portrait_light: false,
            eye_contact: false,
            eye_contact_style: EyeContactStyle::Standard,
            creative_filters: false,
            creative_filter: CreativeFilter::Illustrated,
            video_qualities: VIDEO_QUALITIES.iter().map(|q| q.to_string()).collect(),
            video_quality: "1080p 16:9 30fps".into(),
            recording: false,
            photos_taken: 0,
            videos_taken: 0,
        }
    }
}

impl CameraState {
    /// App already open, front camera, photo mode.
    pub fn running() -> Self {
        Self {
            running: true,
            ..Self::default()
        }
    }

    fn effects_available(&self) -> bool {
        self.running && self.mode == CaptureMode::Video && self.facing == Facing::Front && !self.recording
    }

    fn panel_controls_visible(&self) -> bool {
        self.effects_available() && self.effects_panel_open
    }
}

/// Misbehaviour injected into the simulated app.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// The control cannot be located.
    Hidden(Control),
    /// The control is present but disabled.
    Disabled(Control),
    /// Clicks land but have no effect.
    Stuck(Control),
    /// The control's toggle state cannot be read.
    Unreadable(Control),
    LaunchFails,
}

/// In-memory model of the camera application.
///
/// Control visibility follows the real app: the studio effects panel exists
/// only on the front camera in video mode, its switches only while it is
/// open, and the blur, eye contact and filter choices only while their switch
/// is on. The video quality drop-down is reachable whenever the app is running
/// and not recording. Every successful click, selection, launch, close or
/// window change counts as one mutation.
#[derive(Default)]
pub struct SimulatedCamera {
    state: Mutex<CameraState>,
    faults: Mutex<Vec<Fault>>,
    mutations: Mutex<Vec<String>>,
    waited: Mutex<Duration>,
}

impl SimulatedCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: CameraState) -> Self {
        Self {
            state: Mutex::new(state),
            ..Self::default()
        }
    }

    pub fn with_fault(self, fault: Fault) -> Self {
        self.inject(fault);
        self
    }

    pub fn inject(&self, fault: Fault) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.push(fault);
        }
    }

    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.clear();
        }
    }

    pub fn snapshot(&self) -> CameraState {
        self.lock().clone()
    }

    /// Replace the state wholesale, e.g. to simulate a user acting on the app.
    pub fn set_state(&self, state: CameraState) {
        *self.lock() = state;
    }

    /// Number of mutating interactions performed so far.
    pub fn mutation_count(&self) -> usize {
        self.mutations.lock().map(|m| m.len()).unwrap_or_default()
    }

    /// Log of mutating interactions, oldest first.
    pub fn mutations(&self) -> Vec<String> {
        self.mutations.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn total_waited(&self) -> Duration {
        self.waited.lock().map(|w| *w).unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, CameraState> {
        // Every mutation is a single assignment, so poisoned state is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn has_fault(&self, fault: Fault) -> bool {
        self.faults.lock().map(|f| f.contains(&fault)).unwrap_or(false)
    }

    fn record(&self, what: impl Into<String>) {
        if let Ok(mut log) = self.mutations.lock() {
            log.push(what.into());
        }
    }

    fn locate(&self, state: &CameraState, control: Control) -> Option<ControlInfo> {
        if !state.running || self.has_fault(Fault::Hidden(control)) {
            return None;
        }

        let (visible, toggled) = match control {
            Control::StudioEffects => (state.effects_available(), Some(state.effects_panel_open)),
            Control::BackgroundEffects => {
                (state.panel_controls_visible(), Some(state.background_effects))
            }
            Control::AutomaticFraming => {
                (state.panel_controls_visible(), Some(state.automatic_framing))
            }
            Control::StandardBlur | Control::PortraitBlur => (
                state.panel_controls_visible() && state.background_effects,
                Some(state.blur.control() == control),
            ),
            Control::PortraitLight => (state.panel_controls_visible(), Some(state.portrait_light)),
            Control::EyeContact => (state.panel_controls_visible(), Some(state.eye_contact)),
            Control::EyeContactStandard | Control::EyeContactTeleprompter => (
                state.panel_controls_visible() && state.eye_contact,
                Some(state.eye_contact_style.control() == control),
            ),
            Control::CreativeFilters => (state.panel_controls_visible(), Some(state.creative_filters)),
            Control::IllustratedFilter | Control::AnimatedFilter | Control::WatercolorFilter => (
                state.panel_controls_visible() && state.creative_filters,
                Some(state.creative_filter.control() == control),
            ),
            Control::VideoQuality => (!state.recording, None),
            Control::ChangeCamera => (!state.recording, None),
            Control::SwitchToPhoto => (state.mode == CaptureMode::Video && !state.recording, None),
            Control::SwitchToVideo => (state.mode == CaptureMode::Photo, None),
            Control::TakePhoto => (state.mode == CaptureMode::Photo, None),
            Control::TakeVideo => (state.mode == CaptureMode::Video, Some(state.recording)),
            Control::BarcodeMode => (
                state.mode == CaptureMode::Photo && state.facing == Facing::Front,
                None,
            ),
            Control::DocumentMode => (
                state.mode == CaptureMode::Photo && state.facing == Facing::Rear,
                None,
            ),
            Control::PanoramaMode => (
                state.mode == CaptureMode::Video && state.facing == Facing::Rear,
                None,
            ),
        };

        if !visible {
            return None;
        }

        Some(ControlInfo {
            enabled: !self.has_fault(Fault::Disabled(control)),
            toggled: if self.has_fault(Fault::Unreadable(control)) {
                None
            } else {
                toggled
            },
        })
    }
}

impl Surface for SimulatedCamera {
    fn is_running(&self) -> bool {
        self.lock().running
    }

    fn launch(&self) -> Result<(), CapabilityError> {
        if self.has_fault(Fault::LaunchFails) {
            return Err(CapabilityError::Driver("Failed to open the Camera app".into()));
        }
        let mut state = self.lock();
        state.running = true;
        state.window = WindowState::Normal;
        drop(state);
        self.record("launch");
        Ok(())
    }

    fn close(&self) -> Result<(), CapabilityError> {
        let mut state = self.lock();
        if !state.running {
            return Err(CapabilityError::Unavailable("Camera window".into()));
        }
        state.running = false;
        state.effects_panel_open = false;
        state.recording = false;
        drop(state);
        self.record("close");
        Ok(())
    }

    fn window_state(&self) -> Option<WindowState> {
        let state = self.lock();
        state.running.then_some(state.window)
    }

    fn set_window_state(&self, target: WindowState) -> Result<(), CapabilityError> {
        let mut state = self.lock();
        if !state.running {
            return Err(CapabilityError::Unavailable("Camera window".into()));
        }
        state.window = target;
        drop(state);
        self.record(format!("window {target}"));
        Ok(())
    }

    fn find(&self, control: Control) -> Option<ControlInfo> {
        let state = self.lock();
        self.locate(&state, control)
    }

    fn click(&self, control: Control) -> Result<(), CapabilityError> {
        let mut state = self.lock();
        match self.locate(&state, control) {
            Some(info) if info.enabled => {}
            _ => {
                return Err(CapabilityError::Unavailable(format!("'{}' button", control.title())));
            }
        }

        if !self.has_fault(Fault::Stuck(control)) {
            match control {
                Control::StudioEffects => state.effects_panel_open = !state.effects_panel_open,
                Control::BackgroundEffects => state.background_effects = !state.background_effects,
                Control::AutomaticFraming => state.automatic_framing = !state.automatic_framing,
                Control::StandardBlur => state.blur = BlurType::Standard,
                Control::PortraitBlur => state.blur = BlurType::Portrait,
                Control::PortraitLight => state.portrait_light = !state.portrait_light,
                Control::EyeContact => state.eye_contact = !state.eye_contact,
                Control::EyeContactStandard => state.eye_contact_style = EyeContactStyle::Standard,
                Control::EyeContactTeleprompter => {
                    state.eye_contact_style = EyeContactStyle::Teleprompter;
                }
                Control::CreativeFilters => state.creative_filters = !state.creative_filters,
                Control::IllustratedFilter => state.creative_filter = CreativeFilter::Illustrated,
                Control::AnimatedFilter => state.creative_filter = CreativeFilter::Animated,
                Control::WatercolorFilter => state.creative_filter = CreativeFilter::Watercolor,
                Control::ChangeCamera => {
                    state.facing = match state.facing {
                        Facing::Front => Facing::Rear,
                        Facing::Rear => Facing::Front,
                    };
                }
                Control::SwitchToPhoto => state.mode = CaptureMode::Photo,
                Control::SwitchToVideo => state.mode = CaptureMode::Video,
                Control::TakePhoto => state.photos_taken += 1,
                Control::TakeVideo => {
                    if state.recording {
                        state.videos_taken += 1;
                    }
                    state.recording = !state.recording;
                }
                Control::BarcodeMode
                | Control::DocumentMode
                | Control::PanoramaMode
                | Control::VideoQuality => {}
            }
        }
        drop(state);

        self.record(format!("click {}", control.title()));
        Ok(())
    }

    fn options(&self, control: Control) -> Option<Vec<String>> {
        let state = self.lock();
        match control {
            Control::VideoQuality => self
                .locate(&state, control)
                .map(|_| state.video_qualities.clone()),
            _ => None,
        }
    }

    fn selected(&self, control: Control) -> Option<String> {
        let state = self.lock();
        if self.has_fault(Fault::Unreadable(control)) {
            return None;
        }
        match control {
            Control::VideoQuality => self
                .locate(&state, control)
                .map(|_| state.video_quality.clone()),
            _ => None,
        }
    }

    fn select(&self, control: Control, option: &str) -> Result<(), CapabilityError> {
        let mut state = self.lock();
        match self.locate(&state, control) {
            Some(info) if info.enabled && control == Control::VideoQuality => {}
            _ => return Err(CapabilityError::Unavailable(format!("'{}' drop-down", control.title()))),
        }
        if !state.video_qualities.iter().any(|q| q == option) {
            return Err(CapabilityError::Unavailable(format!("'{option}' entry")));
        }

        if !self.has_fault(Fault::Stuck(control)) {
            state.video_quality = option.to_string();
        }
        drop(state);

        self.record(format!("select {} {option}", control.title()));
        Ok(())
    }

    fn wait(&self, duration: Duration) {
        if let Ok(mut waited) = self.waited.lock() {
            *waited += duration;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_front() -> SimulatedCamera {
        SimulatedCamera::with_state(CameraState {
            mode: CaptureMode::Video,
            ..CameraState::running()
        })
    }

    #[test]
    fn nothing_is_found_while_closed() {
        let camera = SimulatedCamera::new();
        assert!(camera.find(Control::TakePhoto).is_none());
        assert!(camera.window_state().is_none());
    }

    #[test]
    fn effects_panel_only_on_front_camera_in_video_mode() {
        let camera = SimulatedCamera::with_state(CameraState::running());
        assert!(camera.find(Control::StudioEffects).is_none());

        camera.click(Control::SwitchToVideo).unwrap();
        assert!(camera.find(Control::StudioEffects).is_some());

        camera.click(Control::ChangeCamera).unwrap();
        assert!(camera.find(Control::StudioEffects).is_none());
        assert!(camera.find(Control::PanoramaMode).is_some());
    }

    #[test]
    fn switches_appear_once_panel_is_open() {
        let camera = video_front();
        assert!(camera.find(Control::BackgroundEffects).is_none());
        camera.click(Control::StudioEffects).unwrap();

        let info = camera.find(Control::BackgroundEffects).unwrap();
        assert_eq!(info.toggled, Some(false));
        assert!(camera.find(Control::PortraitBlur).is_none());

        camera.click(Control::BackgroundEffects).unwrap();
        assert_eq!(camera.find(Control::StandardBlur).unwrap().toggled, Some(true));
    }

    #[test]
    fn clicks_are_counted_even_when_stuck() {
        let camera = video_front().with_fault(Fault::Stuck(Control::StudioEffects));
        camera.click(Control::StudioEffects).unwrap();
        assert_eq!(camera.mutation_count(), 1);
        assert!(!camera.snapshot().effects_panel_open);
    }

    #[test]
    fn hidden_and_disabled_controls_refuse_clicks() {
        let camera = SimulatedCamera::with_state(CameraState::running())
            .with_fault(Fault::Hidden(Control::TakePhoto))
            .with_fault(Fault::Disabled(Control::ChangeCamera));
        assert!(camera.click(Control::TakePhoto).is_err());
        assert!(matches!(
            camera.click(Control::ChangeCamera),
            Err(CapabilityError::Unavailable(_))
        ));
        assert_eq!(camera.mutation_count(), 0);
    }

    #[test]
    fn unreadable_toggle_reports_no_state() {
        let camera = video_front().with_fault(Fault::Unreadable(Control::StudioEffects));
        assert_eq!(camera.find(Control::StudioEffects).unwrap().toggled, None);
    }

    #[test]
    fn recording_cycle_counts_one_video() {
        let camera = video_front();
        camera.click(Control::TakeVideo).unwrap();
        assert!(camera.snapshot().recording);
        assert!(camera.find(Control::StudioEffects).is_none());
        camera.click(Control::TakeVideo).unwrap();
        let state = camera.snapshot();
        assert!(!state.recording);
        assert_eq!(state.videos_taken, 1);
    }

    #[test]
    fn eye_contact_styles_follow_their_switch() {
        let camera = video_front();
        camera.click(Control::StudioEffects).unwrap();
        assert!(camera.find(Control::EyeContactTeleprompter).is_none());

        camera.click(Control::EyeContact).unwrap();
        assert_eq!(camera.find(Control::EyeContactStandard).unwrap().toggled, Some(true));
        camera.click(Control::EyeContactTeleprompter).unwrap();
        assert_eq!(camera.snapshot().eye_contact_style, EyeContactStyle::Teleprompter);
    }

    #[test]
    fn video_quality_selects_only_offered_entries() {
        let camera = SimulatedCamera::with_state(CameraState {
            video_qualities: vec!["720p 16:9 30fps".into(), "360p 16:9 30fps".into()],
            ..CameraState::running()
        });
        assert_eq!(camera.options(Control::VideoQuality).unwrap().len(), 2);
        assert!(camera.select(Control::VideoQuality, "1440p 16:9 30fps").is_err());

        camera.select(Control::VideoQuality, "720p 16:9 30fps").unwrap();
        assert_eq!(camera.selected(Control::VideoQuality).as_deref(), Some("720p 16:9 30fps"));
        assert_eq!(camera.mutations(), vec!["select Video quality 720p 16:9 30fps"]);
    }

    #[test]
    fn cleared_faults_stop_applying() {
        let camera = SimulatedCamera::with_state(CameraState::running()).with_fault(Fault::LaunchFails);
        camera.clear_faults();
        assert!(camera.launch().is_ok());
    }

    #[test]
    fn wait_accumulates_without_sleeping() {
        let camera = SimulatedCamera::new();
        camera.wait(Duration::from_secs(5));
        camera.wait(Duration::from_secs(1));
        assert_eq!(camera.total_waited(), Duration::from_secs(6));
    }
}
