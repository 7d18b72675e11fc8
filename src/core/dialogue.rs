use log::info;

/// Branching-dialogue runner. The core only starts nodes and listens for the
/// active node to end.
pub trait Dialogue {
    fn start_node(&mut self, name: &str);
    /// Name of the node that ended since the last poll, if any.
    fn poll_finished(&mut self) -> Option<String>;
}

/// Headless dialogue: every node "plays" for a fixed number of polls, and a
/// newly started node replaces the one in progress.
#[derive(Debug, Default)]
pub struct TimedDialogue {
    frames_per_node: u32,
    active: Option<(String, u32)>,
    started: Vec<String>,
}

impl TimedDialogue {
    pub fn new(frames_per_node: u32) -> Self {
        Self {
            frames_per_node,
            ..Default::default()
        }
    }

    pub fn started(&self) -> &[String] {
        &self.started
    }

    pub fn active_node(&self) -> Option<&str> {
        self.active.as_ref().map(|(name, _)| name.as_str())
    }
}

impl Dialogue for TimedDialogue {
    fn start_node(&mut self, name: &str) {
        info!("Dialogue: starting node '{name}'");
        self.started.push(name.to_string());
        self.active = Some((name.to_string(), self.frames_per_node));
    }

    fn poll_finished(&mut self) -> Option<String> {
        let (_, remaining) = self.active.as_mut()?;
        if *remaining > 0 {
            *remaining -= 1;
            return None;
        }
        self.active.take().map(|(name, _)| name)
    }
}
