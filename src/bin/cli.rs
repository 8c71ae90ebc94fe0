//! sa-cli: render Sonic Arranger modules to PCM or WAV, convert them to the
//! editable SOAR form, or print a summary.
//!
//! Usage:
//!   sa-cli convert song.sa out.wav --stereo --loops 1
//!   sa-cli decode song.sa song.soar
//!   sa-cli info song.sa

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use sa_master::{ChannelMode, Controller, MasterError, PcmFormat, StreamConfig, VideoStandard};
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Sonic Arranger module renderer.")]
struct Cli {
    /// Log decoding and rendering details.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Renders a song to WAV, or to bare PCM for .raw/.pcm outputs.
    Convert {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Re-encodes a module in the editable SOAR form.
    Decode { input: PathBuf, output: PathBuf },
    /// Prints the module summary.
    Info { input: PathBuf },
}

#[derive(Args)]
struct RenderArgs {
    /// Use the NTSC clock instead of PAL.
    #[arg(long)]
    ntsc: bool,
    /// Output sample rate in Hz (2000-200000).
    #[arg(short, long, default_value_t = 44_100)]
    rate: u32,
    /// Two output channels: 0+3 left, 1+2 right.
    #[arg(long, conflicts_with = "quad")]
    stereo: bool,
    /// One output channel per Amiga channel.
    #[arg(long)]
    quad: bool,
    /// Never apply the low-pass filter.
    #[arg(long)]
    no_filter: bool,
    /// Song index, starting at 0.
    #[arg(short, long, default_value_t = 0)]
    song: usize,
    /// Number of times to loop the song (0-100).
    #[arg(short, long, default_value_t = 0)]
    loops: u32,
    /// Write bare PCM with silence at 128 instead of 0.
    #[arg(long)]
    unsigned_raw: bool,
}

impl RenderArgs {
    fn stream_config(&self) -> StreamConfig {
        let channel_mode = if self.quad {
            ChannelMode::Quad
        } else if self.stereo {
            ChannelMode::Stereo
        } else {
            ChannelMode::Mono
        };
        StreamConfig {
            sample_rate: self.rate,
            channel_mode,
            allow_filter: !self.no_filter,
            video: if self.ntsc { VideoStandard::Ntsc } else { VideoStandard::Pal },
        }
    }
}

#[derive(Debug, Error)]
enum Failure {
    #[error("{}: {source}", .path.display())]
    Load { path: PathBuf, source: MasterError },
    #[error(transparent)]
    Process(MasterError),
    #[error("cannot create {}: {source}", .path.display())]
    Create { path: PathBuf, source: std::io::Error },
    #[error("cannot write {}: {source}", .path.display())]
    Write { path: PathBuf, source: std::io::Error },
}

impl Failure {
    fn exit_code(&self) -> u8 {
        match self {
            Failure::Load { .. } => 1,
            Failure::Process(_) => 2,
            Failure::Create { .. } => 3,
            Failure::Write { .. } => 4,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("error: {}", failure);
            ExitCode::from(failure.exit_code())
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run(command: Commands) -> Result<(), Failure> {
    match command {
        Commands::Convert { input, output, render } => {
            let ctrl = load(&input)?;
            let config = render.stream_config();
            let data = if is_raw(&output) {
                let format = if render.unsigned_raw { PcmFormat::Unsigned } else { PcmFormat::Signed };
                ctrl.render_pcm(render.song, config, render.loops, format)
            } else {
                ctrl.render_to_wav(render.song, config, render.loops)
            }
            .map_err(Failure::Process)?;
            info!(bytes = data.len(), output = %output.display(), "rendered");
            write_output(&output, &data)
        }
        Commands::Decode { input, output } => {
            let ctrl = load(&input)?;
            let data = ctrl.encode_tagged().map_err(Failure::Process)?;
            write_output(&output, &data)
        }
        Commands::Info { input } => {
            let ctrl = load(&input)?;
            print!("{}", ctrl.info());
            Ok(())
        }
    }
}

fn load(path: &Path) -> Result<Controller, Failure> {
    let mut ctrl = Controller::new();
    ctrl.load_file(path).map_err(|source| Failure::Load { path: path.to_path_buf(), source })?;
    debug!(songs = ctrl.module().songs.len(), "module ready");
    Ok(ctrl)
}

fn is_raw(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("raw") || e.eq_ignore_ascii_case("pcm"))
}

fn write_output(path: &Path, data: &[u8]) -> Result<(), Failure> {
    let mut file = File::create(path).map_err(|source| Failure::Create { path: path.to_path_buf(), source })?;
    file.write_all(data)
        .and_then(|()| file.flush())
        .map_err(|source| Failure::Write { path: path.to_path_buf(), source })
}
