use log::{info, warn};

/// The application around the core: screens, scene loading and credits.
pub trait Host {
    fn show_game_over(&mut self);
    fn reveal_ending(&mut self);
    /// Tears the run down and reloads from the title. Irreversible.
    fn request_full_reload(&mut self);
}

#[derive(Debug, Default)]
pub struct LogHost {
    pub game_over_shown: bool,
    pub ending_revealed: bool,
    pub reload_requests: u32,
}

impl Host for LogHost {
    fn show_game_over(&mut self) {
        warn!("GAME OVER");
        self.game_over_shown = true;
    }

    fn reveal_ending(&mut self) {
        info!("Rolling credits.");
        self.ending_revealed = true;
    }

    fn request_full_reload(&mut self) {
        info!("Full reload requested.");
        self.reload_requests += 1;
    }
}
