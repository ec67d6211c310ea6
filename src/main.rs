use anyhow::Result;
use vitrine_config::VitrineConfig;
use vitrine_motion::{
    BatchMode, Component, CounterConfig, ElementId, ElementRect, FormatMode, Host, NumberFormat,
    ParallaxConfig, ParallaxLayer, ParallaxOffset, RampBatch, SimulatedHost, StaggeredReveal,
    TriggerConfig, VisibilityTrigger,
};

const VIEWPORT_WIDTH: f64 = 1440.0;
const VIEWPORT_HEIGHT: f64 = 900.0;

const HERO: ElementId = ElementId(1);
const ABOUT: ElementId = ElementId(2);
const STATS: [ElementId; 3] = [ElementId(10), ElementId(11), ElementId(12)];
const PROJECTS: ElementId = ElementId(20);
const PROJECT_CARDS: usize = 6;

/// Lay out a one-page portfolio: hero, about, stats strip, project grid.
fn lay_out(host: &mut SimulatedHost) {
    host.place(HERO, ElementRect::new(0.0, 0.0, VIEWPORT_WIDTH, VIEWPORT_HEIGHT));
    host.place(ABOUT, ElementRect::new(160.0, 1100.0, 1120.0, 600.0));
    for (i, stat) in STATS.iter().enumerate() {
        host.place(*stat, ElementRect::new(160.0 + i as f64 * 380.0, 1900.0, 340.0, 200.0));
    }
    host.place(PROJECTS, ElementRect::new(160.0, 2400.0, 1120.0, 1400.0));
}

fn stat_counters(config: &VitrineConfig) -> Vec<(ElementId, CounterConfig)> {
    let projects = CounterConfig::from_config(config, 0.0, 48.0)
        .with_format(NumberFormat::from_settings(&config.counter).with_suffix("+"));
    let visitors = CounterConfig::from_config(config, 0.0, 1_250_000.0)
        .with_format(NumberFormat::new(FormatMode::Abbreviated));
    let satisfaction = CounterConfig::from_config(config, 0.0, 98.5).with_format(
        NumberFormat::new(FormatMode::Percentage)
            .with_decimals(1)
            .with_locale(config.counter.locale.clone()),
    );

    STATS.into_iter().zip([projects, visitors, satisfaction]).collect()
}

fn main() -> Result<()> {
    env_logger::init();

    let scroll_target = std::env::args()
        .find_map(|a| a.strip_prefix("--scroll-to=").map(|s| s.to_string()))
        .map(|s| s.parse::<f64>())
        .transpose()?
        .unwrap_or(3200.0);

    let config = VitrineConfig::load();
    log::info!(
        "vitrine walkthrough: viewport={}x{} frame_interval={}ms reduced_motion={}",
        VIEWPORT_WIDTH,
        VIEWPORT_HEIGHT,
        config.motion.frame_interval_ms,
        config.motion.reduced_motion
    );

    let mut host = SimulatedHost::simulated(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
        .with_frame_interval(config.motion.frame_interval_ms);
    lay_out(&mut host);

    let mut hero = ParallaxOffset::new(
        HERO,
        ParallaxConfig::from_config(&config)
            .with_layer(ParallaxLayer::new("backdrop", 0.3))
            .with_layer(ParallaxLayer::new("headline", 0.6)),
    );
    let mut about = VisibilityTrigger::new(ABOUT, TriggerConfig::from_config(&config));
    let mut stats = RampBatch::from_config(BatchMode::Sequential, stat_counters(&config), &config);
    let mut projects = StaggeredReveal::from_config(PROJECTS, PROJECT_CARDS, &config);

    {
        let mut components: [&mut dyn Component; 4] =
            [&mut hero, &mut about, &mut stats, &mut projects];
        for component in components.iter_mut() {
            component.attach(&mut host);
        }
    }

    // Scroll at a steady 600px/s, one step per frame.
    let step_ms = host.frame_interval_ms();
    let pixels_per_step = 600.0 * step_ms / 1000.0;
    let mut t = 0.0;
    let mut y = 0.0;
    let mut last_logged = -1.0;

    while y < scroll_target {
        y = (y + pixels_per_step).min(scroll_target);
        t += step_ms;
        host.scroll_to(0.0, y);
        host.run_until(
            t,
            &mut [&mut hero as &mut dyn Component, &mut about, &mut stats, &mut projects],
        );

        if y - last_logged >= 400.0 || y >= scroll_target {
            last_logged = y;
            log::info!(
                "t={:>6.0}ms y={:>5.0} hero={} about={} stats=[{}] cards={}/{}",
                host.now(),
                y,
                hero.transform(),
                about.pose(host.now()).transform(),
                stats
                    .counters()
                    .iter()
                    .map(|c| c.formatted())
                    .collect::<Vec<_>>()
                    .join(", "),
                projects.visible_count(),
                projects.item_count(),
            );
        }
    }

    // Let delayed reveals and running counters settle.
    let settle = t + 5000.0;
    host.run_until(
        settle,
        &mut [&mut hero as &mut dyn Component, &mut about, &mut stats, &mut projects],
    );

    for (index, event) in stats.drain_events() {
        log::debug!("stat {index}: {event:?}");
    }
    log::info!(
        "settled at t={}ms: about revealed={} stats completed={} cards visible={}/{}",
        host.now(),
        about.revealed(),
        stats.all_completed(),
        projects.visible_count(),
        projects.item_count(),
    );
    for layer in hero.layers() {
        log::info!(
            "hero layer {} offset={:.1} transform={}",
            layer.id,
            layer.offset,
            layer.transform
        );
    }

    {
        let mut components: [&mut dyn Component; 4] =
            [&mut hero, &mut about, &mut stats, &mut projects];
        for component in components.iter_mut() {
            component.detach(&mut host);
        }
    }
    log::info!(
        "detached: frames={} timers={} observers={}",
        host.pending_frames(),
        host.pending_timers(),
        host.active_observers()
    );

    Ok(())
}
