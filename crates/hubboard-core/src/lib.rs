pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod item;
pub mod policy;
pub mod progress;
pub mod render;
pub mod selection;
pub mod sheet;
pub mod timeline;
pub mod window;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use item::{
  ItemStatus,
  LayoutError,
  ScheduleItem,
  TimeRange
};
pub use progress::{
  ProgressState,
  progress,
  progress_on
};
pub use timeline::{
  ItemGroup,
  LayoutResult,
  OverlapCheck,
  Row,
  layout
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting hubboard"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let settings =
    config::Settings::from_config(&cfg)
      .context(
        "invalid dashboard \
         configuration"
      )?;

  let mut renderer =
    render::Renderer::new(&settings);
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  commands::dispatch(
    &cfg,
    &settings,
    &mut renderer,
    inv
  )?;

  info!("done");
  Ok(())
}
