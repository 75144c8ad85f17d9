use anyhow::Result;
use studydeck::app::App;
use studydeck::config::Config;
use studydeck::logging;

fn main() -> Result<()> {
    // Ignore SIGINT so Ctrl+C arrives as a key event and the terminal
    // is always restored before exiting
    #[cfg(unix)]
    unsafe {
        signal_hook::low_level::register(signal_hook::consts::SIGINT, || {})?;
    }

    let config = Config::load()?;
    config.ensure_dirs()?;
    let _log_guard = logging::init_tracing(&config);

    tracing::info!(
        subjects_dir = %config.subjects_dir.display(),
        db = %config.db_path.display(),
        "starting"
    );

    let app = App::new(config)?;

    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    ratatui::restore();

    if let Err(err) = &result {
        tracing::error!("{:#}", err);
    }

    result
}
