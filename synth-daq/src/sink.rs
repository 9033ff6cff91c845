//! Flat binary output files
//!
//! Files are truncated when a session opens them. `ch1.bin`/`ch2.bin` hold
//! little-endian `i16` samples appended cycle by cycle; `imu.bin` holds
//! either native-endian `f32` (12 per all-processed batch) or the raw
//! sensor byte stream. No headers.

use crate::config::SensorMode;
use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

fn open(path: &Path) -> Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|source| Error::Output {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(BufWriter::new(file))
}

/// Byte-counting writer that attributes failures to its path
struct Output<W: Write> {
    writer: W,
    path: PathBuf,
    bytes: u64,
}

impl<W: Write> Output<W> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data).map_err(|source| Error::Output {
            path: self.path.clone(),
            source,
        })?;
        self.bytes += data.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|source| Error::Output {
            path: self.path.clone(),
            source,
        })
    }
}

/// Sample file for one acquisition channel
pub struct ChannelSink<W: Write = BufWriter<File>> {
    out: Output<W>,
    scratch: Vec<u8>,
}

impl ChannelSink {
    /// Create (or truncate) the sample file at `path`
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self::from_writer(open(path)?, path))
    }
}

impl<W: Write> ChannelSink<W> {
    /// Wrap an arbitrary writer; `path` is only used in error messages
    pub fn from_writer<P: AsRef<Path>>(writer: W, path: P) -> Self {
        Self {
            out: Output {
                writer,
                path: path.as_ref().to_path_buf(),
                bytes: 0,
            },
            scratch: Vec::new(),
        }
    }

    /// Append samples as little-endian i16
    pub fn write_samples(&mut self, samples: &[i16]) -> Result<()> {
        self.scratch.clear();
        self.scratch.reserve(samples.len() * 2);
        for sample in samples {
            self.scratch.extend_from_slice(&sample.to_le_bytes());
        }
        let Self { out, scratch } = self;
        out.write(scratch)
    }

    /// Flush and report the bytes written
    pub fn finish(&mut self) -> Result<u64> {
        self.out.flush()?;
        Ok(self.out.bytes)
    }

    pub fn bytes_written(&self) -> u64 {
        self.out.bytes
    }

    pub fn path(&self) -> &Path {
        &self.out.path
    }

    pub fn into_inner(self) -> W {
        self.out.writer
    }
}

/// Sensor output file
pub struct SensorSink<W: Write = BufWriter<File>> {
    out: Output<W>,
    mode: SensorMode,
}

impl SensorSink {
    /// Create (or truncate) the sensor file at `path`
    pub fn create<P: AsRef<Path>>(path: P, mode: SensorMode) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self::from_writer(open(path)?, path, mode))
    }
}

impl<W: Write> SensorSink<W> {
    pub fn from_writer<P: AsRef<Path>>(writer: W, path: P, mode: SensorMode) -> Self {
        Self {
            out: Output {
                writer,
                path: path.as_ref().to_path_buf(),
                bytes: 0,
            },
            mode,
        }
    }

    pub fn mode(&self) -> SensorMode {
        self.mode
    }

    /// Append decoded values as native-endian f32 (processed mode only)
    pub fn write_values(&mut self, values: &[f32]) -> Result<()> {
        if self.mode != SensorMode::Processed {
            return Ok(());
        }
        let mut buf = Vec::with_capacity(values.len() * 4);
        for value in values {
            buf.extend_from_slice(&value.to_ne_bytes());
        }
        self.out.write(&buf)
    }

    /// Append received bytes verbatim (raw mode only)
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        if self.mode != SensorMode::Raw {
            return Ok(());
        }
        self.out.write(bytes)
    }

    pub fn finish(&mut self) -> Result<u64> {
        self.out.flush()?;
        Ok(self.out.bytes)
    }

    pub fn path(&self) -> &Path {
        &self.out.path
    }

    pub fn into_inner(self) -> W {
        self.out.writer
    }
}
