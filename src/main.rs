//! Line Rider AI entry point
//!
//! Headless runner: builds the simulation, hands control to the AI and
//! drives the clock at the display rate until enough generations have run.
//!
//! Usage: `line-rider-ai [settings.json] [generations]`

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use line_rider_ai::renderer::{RenderFrame, RenderSink};
    use line_rider_ai::{SimSettings, Simulation};

    const DEFAULT_GENERATIONS: u32 = 3;
    /// Frames between log lines
    const REPORT_EVERY: u64 = 600;

    /// Logs a one-line summary of each presented frame
    struct LogSink;

    impl RenderSink for LogSink {
        fn present(&mut self, frame: &RenderFrame) {
            log::info!(
                "t={}s gen={} strategy={} bodies={} score={:.0} flips={} pos=({:.0}, {:.0})",
                frame.time_ms / 1000,
                frame.stats.generation,
                frame.stats.current_strategy,
                frame.bodies.len(),
                frame.agent.cumulative_score,
                frame.agent.flips,
                frame.agent.position.x,
                frame.agent.position.y,
            );
        }
    }

    fn parse_args() -> Result<(SimSettings, u32), String> {
        let mut settings = SimSettings::default();
        let mut generations = DEFAULT_GENERATIONS;
        for arg in std::env::args().skip(1) {
            match arg.parse::<u32>() {
                Ok(n) => generations = n,
                Err(_) if arg.ends_with(".json") => settings = SimSettings::load(&arg),
                Err(_) => return Err(format!("unrecognized argument: {}", arg)),
            }
        }
        Ok((settings, generations))
    }

    pub fn run() -> Result<(), String> {
        let (settings, generations) = parse_args()?;
        let frame_ms = settings.frame_dt_ms.round().max(1.0) as u64;
        log::info!(
            "Line Rider AI (headless) starting: seed {}, {} generations",
            settings.seed,
            generations
        );

        let mut sim = Simulation::new(settings);
        sim.start();
        sim.toggle_control();

        let mut sink = LogSink;
        let mut now_ms = 0;
        let mut frame = 0u64;
        while sim.engine().stats().generation < generations {
            now_ms += frame_ms;
            sim.advance(now_ms);
            frame += 1;
            if frame % REPORT_EVERY == 0 {
                sim.present(&mut sink);
            }
        }

        let stats = sim.engine().stats();
        let json = serde_json::to_string_pretty(&stats).map_err(|e| e.to_string())?;
        println!("{}", json);
        sim.shutdown();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(e) = headless::run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The host drives `Simulation` directly on the web
}
