//! Sand Alchemy entry point
//!
//! Native: a headless demo that pours two materials into the reaction zone
//! and logs what gets discovered. Run with `RUST_LOG=info`.
//!
//! Usage: `sand-alchemy [ticks] [save-dir] [low|medium|high]`
//!
//! A quality argument is saved to the settings; `show_debug` and
//! `tap_to_toggle` are read from the saved settings.

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;

    use glam::Vec2;
    use sand_alchemy::persistence::FileStore;
    use sand_alchemy::sim::Rect;
    use sand_alchemy::{
        Catalog, KeyValueStore, MemoryStore, PourControl, QualityPreset, Sandbox, Settings,
        TickInput, Tuning,
    };

    env_logger::init();
    log::info!("Sand Alchemy (headless) starting...");

    let mut args = std::env::args().skip(1);
    let ticks: u32 = match args.next() {
        Some(arg) => arg.parse()?,
        None => 600,
    };
    let mut store: Box<dyn KeyValueStore> = match args.next() {
        Some(dir) => Box::new(FileStore::open(dir)?),
        None => Box::new(MemoryStore::new()),
    };

    let mut settings = Settings::load(store.as_ref());
    if let Some(arg) = args.next() {
        settings.quality =
            QualityPreset::from_str(&arg).ok_or_else(|| format!("unknown quality `{arg}`"))?;
        settings.save(store.as_mut());
    }
    log::info!("Quality: {}", settings.quality.as_str());

    let catalog = Arc::new(Catalog::demo()?);
    let mut tuning = Tuning::default();
    settings.apply_to(&mut tuning);
    tuning.reaction.threshold = 20;
    tuning.reaction.check_interval = 1;

    let mut sandbox = Sandbox::new(catalog.clone(), tuning, store);
    sandbox.set_arena_bounds(400.0, 300.0);
    sandbox.set_zone(Rect::new(100.0, 150.0, 200.0, 150.0));

    let lookup = |key: &str| catalog.id(key).ok_or_else(|| format!("unknown material `{key}`"));
    let spouts = [
        (lookup("water")?, 0x3399ff, Vec2::new(170.0, 40.0)),
        (lookup("fire")?, 0xff5522, Vec2::new(230.0, 40.0)),
    ];

    let mut control = PourControl::new(settings.tap_to_toggle);
    let (mut material, mut color) = (spouts[0].0, spouts[0].1);
    for tick in 0..ticks {
        // Switch spouts every half second
        if tick % 30 == 0 {
            let spout = spouts[(tick / 30) as usize % spouts.len()];
            (material, color) = (spout.0, spout.1);
            if control.toggle_mode() && control.is_pouring() {
                // Tap once to stop the previous pour
                control.pointer_down(0, control.position());
                control.pointer_up(0);
            }
            control.pointer_up(0);
            control.pointer_down(0, spout.2);
            if control.toggle_mode() {
                control.pointer_up(0);
            }
        }

        let input = TickInput {
            pour: control.request(material, color),
        };
        let report = sandbox.tick(&input);
        if let Some(event) = report.reaction {
            let info = catalog.info(event.result);
            println!(
                "tick {:>4}: {} {}{}",
                tick,
                info.glyph,
                info.name,
                if event.is_new { " (new!)" } else { "" }
            );
        }
        if settings.show_debug && tick % 60 == 59 {
            let stats = sandbox.stats();
            println!(
                "[debug] tick {:>4}: {} particles, pour rate {}",
                tick, stats.active, stats.pour_rate
            );
        }
    }

    let stats = sandbox.stats();
    println!(
        "particles {}/{} | discovered {}/{}",
        stats.active, stats.capacity, stats.discovered, stats.total
    );
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The browser host drives `Sandbox::tick` from its animation frame
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        return;
    }
    log::info!("Sand Alchemy core loaded");
}
