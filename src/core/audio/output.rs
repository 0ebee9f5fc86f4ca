//! cpal output stream rendering the looping segment queue.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, StreamConfig};
use log::{error, info};

use crate::core::audio::error::{AudioError, AudioResult};
use crate::core::audio::segment::SegmentQueue;

pub struct OutputStream {
    stream: cpal::Stream,
    device_name: String,
}

impl OutputStream {
    /// Builds a paused stream on the default output device. Audio from the
    /// queue is `source_rate` Hz mono and is resampled to the device config.
    pub fn open(queue: Arc<SegmentQueue>, source_rate: u32) -> AudioResult<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let device_name = device
            .name()
            .unwrap_or_else(|_| "Default output device".to_string());

        let supported_config = device
            .default_output_config()
            .map_err(|err| AudioError::Config(err.to_string()))?;
        let sample_format = supported_config.sample_format();
        let config = supported_config.config();

        info!(
            "Opening audio output {} ({} Hz, {} channels, {:?})",
            device_name, config.sample_rate.0, config.channels, sample_format
        );

        let step = source_rate as f64 / config.sample_rate.0 as f64;
        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, queue, step)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, queue, step)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, queue, step)?,
            other => return Err(AudioError::UnsupportedFormat(format!("{other:?}"))),
        };

        Ok(Self {
            stream,
            device_name,
        })
    }

    pub fn play(&self) -> AudioResult<()> {
        self.stream
            .play()
            .map_err(|err| AudioError::PlayStream(err.to_string()))
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    queue: Arc<SegmentQueue>,
    step: f64,
) -> AudioResult<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                queue.render(&mut scratch, channels, step);
                for (out, sample) in data.iter_mut().zip(&scratch) {
                    *out = T::from_sample(*sample);
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|err| AudioError::BuildStream(err.to_string()))
}
