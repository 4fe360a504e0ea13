//! ffmpeg subprocess backend.
//!
//! Decoding pipes `ffmpeg -f rawvideo -pix_fmt rgb24 -` and reads one
//! frame-sized chunk at a time; encoding feeds rgb24 frames into the
//! encoder's stdin at the source's exact frame rate.
//!
//! The decoder keeps ffmpeg's autorotation, so frames arrive at the
//! descriptor's display size, and passes timestamps through so every
//! source frame is emitted exactly once, even for variable-rate footage.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use cruxvision_core::ffmpeg::{self as probe, FfmpegError};
use cruxvision_core::video::SourceVideoDescriptor;
use image::RgbImage;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::{check_frame_size, FrameDecodeError, FrameReader, FrameWriter, VideoBackend, VideoError};

#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg_bin: String,
    ffprobe_bin: String,
    codec: String,
}

impl FfmpegBackend {
    pub fn new(
        ffmpeg_bin: impl Into<String>,
        ffprobe_bin: impl Into<String>,
        codec: impl Into<String>,
    ) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            ffprobe_bin: ffprobe_bin.into(),
            codec: codec.into(),
        }
    }
}

#[async_trait]
impl VideoBackend for FfmpegBackend {
    async fn probe(&self, path: &Path) -> Result<SourceVideoDescriptor, VideoError> {
        let output = probe::probe_video(&self.ffprobe_bin, path).await?;
        Ok(probe::describe(path, &output)?)
    }

    async fn open_reader(
        &self,
        source: &SourceVideoDescriptor,
    ) -> Result<Box<dyn FrameReader>, VideoError> {
        let mut child = Command::new(&self.ffmpeg_bin)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(&source.path)
            .args(["-fps_mode", "passthrough"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(FfmpegError::NotFound)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VideoError::Unsupported("ffmpeg stdout was not captured".into()))?;

        Ok(Box::new(FfmpegFrameReader {
            child,
            stdout,
            width: source.width,
            height: source.height,
            frame_bytes: source.frame_bytes(),
            next_index: 0,
        }))
    }

    async fn open_writer(
        &self,
        output: &Path,
        like: &SourceVideoDescriptor,
    ) -> Result<Box<dyn FrameWriter>, VideoError> {
        let size = format!("{}x{}", like.width, like.height);
        let rate = like.frame_rate.to_string();

        let mut child = Command::new(&self.ffmpeg_bin)
            .args(["-v", "error", "-y", "-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-s", &size, "-r", &rate, "-i", "-"])
            .args(["-c:v", &self.codec, "-pix_fmt", "yuv420p", "-r", &rate])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(FfmpegError::NotFound)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| VideoError::Unsupported("ffmpeg stdin was not captured".into()))?;

        tracing::debug!(output = %output.display(), size = %size, rate = %rate, codec = %self.codec, "Encoder started");

        Ok(Box::new(FfmpegFrameWriter {
            child,
            stdin: Some(stdin),
            output: output.to_path_buf(),
            width: like.width,
            height: like.height,
            frames_written: 0,
        }))
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

struct FfmpegFrameReader {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    frame_bytes: usize,
    next_index: u64,
}

impl FfmpegFrameReader {
    fn decode_error(&self, reason: impl Into<String>) -> FrameDecodeError {
        FrameDecodeError {
            frame_index: self.next_index,
            reason: reason.into(),
        }
    }

    /// Fill `buf` from the pipe. Returns the number of bytes read, short
    /// only at end of stream.
    async fn fill(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.stdout.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }

    async fn exit_status(&mut self) -> Result<ExitStatus, FrameDecodeError> {
        self.child
            .wait()
            .await
            .map_err(|e| self.decode_error(format!("waiting for ffmpeg: {e}")))
    }
}

#[async_trait]
impl FrameReader for FfmpegFrameReader {
    async fn read_frame(&mut self) -> Result<Option<RgbImage>, FrameDecodeError> {
        let mut buf = vec![0u8; self.frame_bytes];
        let filled = self
            .fill(&mut buf)
            .await
            .map_err(|e| self.decode_error(e.to_string()))?;

        if filled == 0 {
            let status = self.exit_status().await?;
            if !status.success() {
                return Err(self.decode_error(format!("ffmpeg exited with {status}")));
            }
            return Ok(None);
        }
        if filled < self.frame_bytes {
            return Err(self.decode_error(format!(
                "short read: {filled} of {} bytes",
                self.frame_bytes
            )));
        }

        let frame = RgbImage::from_raw(self.width, self.height, buf)
            .ok_or_else(|| self.decode_error("buffer does not match frame size"))?;
        self.next_index += 1;
        Ok(Some(frame))
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

struct FfmpegFrameWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    output: PathBuf,
    width: u32,
    height: u32,
    frames_written: u64,
}

#[async_trait]
impl FrameWriter for FfmpegFrameWriter {
    async fn write_frame(&mut self, frame: &RgbImage) -> Result<(), VideoError> {
        check_frame_size(frame, self.width, self.height)?;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| VideoError::Unsupported("encoder already closed".into()))?;
        stdin.write_all(frame.as_raw()).await?;
        self.frames_written += 1;
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> Result<u64, VideoError> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.flush().await?;
            // Closing stdin signals end of input to the encoder.
            drop(stdin);
        }

        let output = self.child.wait_with_output().await?;
        if !output.status.success() {
            return Err(FfmpegError::ExecutionFailed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            }
            .into());
        }

        tracing::debug!(output = %self.output.display(), frames = self.frames_written, "Encoder finished");
        Ok(self.frames_written)
    }
}
