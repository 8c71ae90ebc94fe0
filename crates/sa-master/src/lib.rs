//! Headless controller for the Sonic Arranger player.
//!
//! Loads a module once and hands out PCM renders, WAV files and re-encoded
//! modules, so the CLI and tests share one entry point.

mod wav;

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

// Re-export common types so callers don't need sa-ir/sa-engine directly.
pub use sa_engine::{ChannelMode, RangeError, Stream, StreamConfig, StreamError, VideoStandard, MAX_LOOPS};
pub use sa_formats::FormatError;
pub use sa_ir::{Module, Song, SourceFormat};

pub use wav::{signed_to_wav, write_wav, WAV_HEADER_LEN};

/// Everything that can go wrong between reading a module and writing audio.
#[derive(Debug, Error)]
pub enum MasterError {
    #[error("failed to load module: {0}")]
    Load(#[from] FormatError),
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MasterError>;

/// Sample encoding of rendered PCM.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PcmFormat {
    /// Silence at 0.
    #[default]
    Signed,
    /// Silence at 128.
    Unsigned,
}

/// Headless player controller. Owns one decoded module.
pub struct Controller {
    module: Arc<Module>,
}

impl Controller {
    pub fn new() -> Self {
        Self { module: Arc::new(Module::new()) }
    }

    pub fn with_module(module: Module) -> Self {
        Self { module: Arc::new(module) }
    }

    // --- Module management ---

    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    pub fn load_bytes(&mut self, data: &[u8]) -> Result<()> {
        let module = sa_formats::load_module(data)?;
        debug!(format = ?module.format, songs = module.songs.len(), "loaded module");
        self.module = Arc::new(module);
        Ok(())
    }

    /// Read and decode a module file. A missing file is a load failure.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(FormatError::from)?;
        info!(path = %path.display(), bytes = data.len(), "reading module");
        self.load_bytes(&data)
    }

    /// The module in the chunked encoding.
    pub fn encode_tagged(&self) -> Result<Vec<u8>> {
        Ok(sa_formats::save_module(&self.module)?)
    }

    /// Write the module in the chunked encoding to `path`.
    pub fn save_tagged(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.encode_tagged()?;
        fs::write(path, bytes)?;
        Ok(())
    }

    // --- Rendering ---

    /// Open a stream over one song of the loaded module.
    pub fn stream(&self, song: usize, config: StreamConfig) -> Result<Stream> {
        Ok(Stream::new(Arc::clone(&self.module), song, config)?)
    }

    /// Render a whole song, looping at most `loops` times.
    pub fn render_pcm(&self, song: usize, config: StreamConfig, loops: u32, format: PcmFormat) -> Result<Vec<u8>> {
        let stream = self.stream(song, config)?;
        let pcm = match format {
            PcmFormat::Signed => stream.to_signed_vec(loops, true)?,
            PcmFormat::Unsigned => stream.to_unsigned_vec(loops, true)?,
        };
        debug!(song, bytes = pcm.len(), loops = stream.loop_counter(), "rendered song");
        Ok(pcm)
    }

    /// Render a whole song as a complete WAV file.
    pub fn render_to_wav(&self, song: usize, config: StreamConfig, loops: u32) -> Result<Vec<u8>> {
        let pcm = self.render_pcm(song, config, loops, PcmFormat::Unsigned)?;
        let mut buf = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
        write_wav(&mut buf, &pcm, config.sample_rate, config.channel_mode)?;
        Ok(buf)
    }

    /// Render a song and write it to `path` as WAV.
    pub fn write_wav_file(&self, path: impl AsRef<Path>, song: usize, config: StreamConfig, loops: u32) -> Result<()> {
        let wav = self.render_to_wav(song, config, loops)?;
        fs::write(path, wav)?;
        Ok(())
    }

    pub fn info(&self) -> ModuleInfo {
        ModuleInfo::of(&self.module)
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a module for display.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleInfo {
    pub format: SourceFormat,
    pub version: String,
    pub author: Option<String>,
    pub songs: Vec<Song>,
    pub pattern_steps: usize,
    pub notes: usize,
    pub instruments: usize,
    pub samples: usize,
    pub waves: usize,
    pub adsr_waves: usize,
    pub amf_waves: usize,
}

impl ModuleInfo {
    pub fn of(module: &Module) -> Self {
        Self {
            format: module.format,
            version: module.version_str().to_string(),
            author: module.author.clone(),
            songs: module.songs.clone(),
            pattern_steps: module.pattern_steps(),
            notes: module.notes.len(),
            instruments: module.instruments.len(),
            samples: module.samples.len(),
            waves: module.waves.len(),
            adsr_waves: module.adsr_waves.len(),
            amf_waves: module.amf_waves.len(),
        }
    }
}

impl fmt::Display for ModuleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = match self.format {
            SourceFormat::Tagged => "SOAR",
            SourceFormat::Legacy => "offset table",
        };
        writeln!(f, "Format:      {} ({})", format, self.version)?;
        if let Some(author) = &self.author {
            writeln!(f, "Author:      {}", author)?;
        }
        writeln!(f, "Steps:       {}", self.pattern_steps)?;
        writeln!(f, "Notes:       {}", self.notes)?;
        writeln!(f, "Instruments: {}", self.instruments)?;
        writeln!(f, "Samples:     {}", self.samples)?;
        writeln!(f, "Waves:       {} (ADSR {}, AMF {})", self.waves, self.adsr_waves, self.amf_waves)?;
        writeln!(f, "Songs:       {}", self.songs.len())?;
        for (i, song) in self.songs.iter().enumerate() {
            writeln!(
                f,
                "  {:2}: steps {:3}-{:3} repeat {:3} rows {:3} speed {:2} @ {:3} Hz, ~{:.1} s",
                i,
                song.start_pos,
                song.stop_pos,
                song.repeat_pos,
                song.pattern_length,
                song.speed,
                song.irqps,
                song.pass_duration(),
            )?;
        }
        Ok(())
    }
}
