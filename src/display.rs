//! Display enumeration.
//!
//! The enumerator keeps the last snapshot of physical outputs and reports
//! whether a re-read changed it. Polling is driven from the UI by a timer
//! subscription, so change notifications form an endless, lazily produced
//! sequence for as long as the application runs.

use std::collections::HashMap;
use std::fmt;

use crate::config::DisplayConfig;

/// Session-stable handle of one physical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayId(pub u32);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Rectangle in the desktop pixel coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Bounds {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_drawable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Whether `other` lies inside these bounds, allowing float slack.
    pub fn contains(&self, other: &Bounds) -> bool {
        const EPS: f32 = 0.5;
        other.x + EPS >= self.x
            && other.y + EPS >= self.y
            && other.x + other.width <= self.x + self.width + EPS
            && other.y + other.height <= self.y + self.height + EPS
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayDescriptor {
    pub id: DisplayId,
    pub bounds: Bounds,
    /// Hardware refresh rate driving this display's refresh signal.
    pub refresh_hz: f32,
}

impl DisplayDescriptor {
    pub fn label(&self, index: usize) -> String {
        format!(
            "Screen {}: {}x{}",
            index + 1,
            self.bounds.width.round() as u32,
            self.bounds.height.round() as u32
        )
    }
}

/// Identity of an output as its source reports it. Survives re-polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKey {
    /// Monitor id from the operating system.
    System(u32),
    /// Position in the config file's display list.
    Configured(usize),
}

/// An output as seen by a source, before the enumerator gives it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedOutput {
    pub key: OutputKey,
    pub bounds: Bounds,
    pub refresh_hz: f32,
}

/// Anything that can list the physical outputs currently connected.
pub trait DisplaySource {
    fn detect_outputs(&self) -> Result<Vec<DetectedOutput>, String>;
}

/// Monitor geometry as reported by the operating system.
#[derive(Debug, Clone, PartialEq)]
pub struct Monitor {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub frequency: f32,
    pub is_primary: bool,
}

impl From<display_info::DisplayInfo> for Monitor {
    fn from(info: display_info::DisplayInfo) -> Self {
        Monitor {
            id: info.id,
            x: info.x,
            y: info.y,
            width: info.width,
            height: info.height,
            frequency: info.frequency,
            is_primary: info.is_primary,
        }
    }
}

/// Primary monitor first, then left to right, top to bottom.
pub fn system_outputs(mut monitors: Vec<Monitor>, default_refresh_hz: f32) -> Vec<DetectedOutput> {
    monitors.sort_by_key(|m| (!m.is_primary, m.x, m.y, m.id));
    monitors
        .into_iter()
        .map(|m| DetectedOutput {
            key: OutputKey::System(m.id),
            bounds: Bounds::new(m.x as f32, m.y as f32, m.width as f32, m.height as f32),
            refresh_hz: if m.frequency.is_finite() && m.frequency > 0.0 {
                m.frequency
            } else {
                default_refresh_hz
            },
        })
        .collect()
}

/// Monitors known to the operating system. A non-empty display list in the
/// config file replaces OS enumeration entirely.
pub struct SystemDisplays {
    configured: Vec<DisplayConfig>,
    default_refresh_hz: f32,
}

impl SystemDisplays {
    pub fn new(configured: Vec<DisplayConfig>, default_refresh_hz: f32) -> Self {
        SystemDisplays {
            configured,
            default_refresh_hz,
        }
    }

    fn configured_outputs(&self) -> Vec<DetectedOutput> {
        self.configured
            .iter()
            .enumerate()
            .map(|(i, d)| DetectedOutput {
                key: OutputKey::Configured(i),
                bounds: Bounds::new(d.x, d.y, d.width, d.height),
                refresh_hz: d.refresh_hz.unwrap_or(self.default_refresh_hz),
            })
            .collect()
    }
}

impl DisplaySource for SystemDisplays {
    fn detect_outputs(&self) -> Result<Vec<DetectedOutput>, String> {
        if !self.configured.is_empty() {
            return Ok(self.configured_outputs());
        }

        let monitors = display_info::DisplayInfo::all().map_err(|e| e.to_string())?;
        Ok(system_outputs(
            monitors.into_iter().map(Monitor::from).collect(),
            self.default_refresh_hz,
        ))
    }
}

/// Owns the current display snapshot. Everyone else only reads it.
///
/// Ids are handed out on first sighting of an output and kept for the rest
/// of the session, whatever else comes and goes.
pub struct DisplayEnumerator<S> {
    source: S,
    displays: Vec<DisplayDescriptor>,
    ids: HashMap<OutputKey, DisplayId>,
    next_id: u32,
}

impl<S: DisplaySource> DisplayEnumerator<S> {
    pub fn new(source: S) -> Self {
        let mut enumerator = DisplayEnumerator {
            source,
            displays: Vec::new(),
            ids: HashMap::new(),
            next_id: 1,
        };
        match enumerator.source.detect_outputs() {
            Ok(outputs) => enumerator.displays = enumerator.identify(outputs),
            Err(e) => log::warn!("Display enumeration failed: {}", e),
        }
        log::info!(
            "Display enumerator started with {} displays",
            enumerator.displays.len()
        );
        enumerator
    }

    pub fn current_displays(&self) -> &[DisplayDescriptor] {
        &self.displays
    }

    pub fn len(&self) -> usize {
        self.displays.len()
    }

    fn identify(&mut self, outputs: Vec<DetectedOutput>) -> Vec<DisplayDescriptor> {
        outputs
            .into_iter()
            .map(|output| {
                let id = *self.ids.entry(output.key).or_insert_with(|| {
                    let id = DisplayId(self.next_id);
                    self.next_id += 1;
                    id
                });
                DisplayDescriptor {
                    id,
                    bounds: output.bounds,
                    refresh_hz: output.refresh_hz,
                }
            })
            .collect()
    }

    /// Re-read the source. Returns true when the topology changed. A failed
    /// read keeps the last snapshot.
    pub fn refresh(&mut self) -> bool {
        let outputs = match self.source.detect_outputs() {
            Ok(outputs) => outputs,
            Err(e) => {
                log::warn!("Display poll failed, keeping last snapshot: {}", e);
                return false;
            }
        };
        let fresh = self.identify(outputs);
        if fresh == self.displays {
            log::trace!("Display poll: no change ({} displays)", fresh.len());
            return false;
        }
        log::info!(
            "Display topology changed: {} -> {} displays",
            self.displays.len(),
            fresh.len()
        );
        self.displays = fresh;
        true
    }
}
