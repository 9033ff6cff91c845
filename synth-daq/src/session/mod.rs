//! Session coordinator
//!
//! Owns everything one recording needs: the acquisition backend, the
//! synthesizers, the output files, the shared heartbeat and the active flag
//! the sensor reader watches. The capture loop runs on the calling thread;
//! the sensor reader gets a thread of its own.
//!
//! Start order: counters zeroed, files opened, board configured, sensor
//! brought up, reader spawned, synthesizers programmed and enabled,
//! sampling started, one buffer fill waited out, trigger armed,
//! synthesizers triggered.

mod experiment;
mod summary;

pub use experiment::Experiment;
pub use summary::Summary;

use crate::acquisition::{
    AcquisitionBackend, AcquisitionLoop, ChannelSinks, Clock, Counters, TriggerSource,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::sink::{ChannelSink, SensorSink};
use crate::synth::{SynthBus, SynthRig};
use crate::transport::Transport;
use crate::um7::{background_task, ReaderStats, RegisterClient, SensorSession, SharedHeartbeat};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub struct SessionCoordinator<B, S, C>
where
    B: AcquisitionBackend,
    S: SynthBus,
    C: Clock,
{
    config: Config,
    experiment: Experiment,
    backend: B,
    rig: SynthRig<S>,
    clock: C,
    acquisition: AcquisitionLoop,
    active: Arc<AtomicBool>,
    heartbeat: SharedHeartbeat,
    sinks: Option<ChannelSinks>,
    reader: Option<JoinHandle<Result<ReaderStats>>>,
}

impl<B, S, C> SessionCoordinator<B, S, C>
where
    B: AcquisitionBackend,
    S: SynthBus,
    C: Clock,
{
    /// Build the synthesizer images; nothing touches hardware yet
    pub fn new(config: Config, backend: B, bus: S, clock: C) -> Result<Self> {
        let experiment = Experiment::from_config(&config.experiment);
        let rig = SynthRig::from_config(&config.synth, bus)?;
        Ok(Self {
            acquisition: AcquisitionLoop::new(experiment.settings),
            experiment,
            config,
            backend,
            rig,
            clock,
            active: Arc::new(AtomicBool::new(false)),
            heartbeat: SharedHeartbeat::new(),
            sinks: None,
            reader: None,
        })
    }

    /// Start, capture and stop; `stop` runs even when a step fails
    pub fn run<T>(&mut self, sensor: Option<T>) -> Result<Summary>
    where
        T: Transport + 'static,
    {
        let outcome = self.start(sensor).and_then(|()| self.acquire().map(|_| ()));
        let summary = self.stop();
        if let Err(e) = outcome {
            log::error!("Session aborted: {}", e);
            return Err(e);
        }
        summary
    }

    /// Bring everything up and arm the first capture
    pub fn start<T>(&mut self, sensor: Option<T>) -> Result<()>
    where
        T: Transport + 'static,
    {
        self.acquisition = AcquisitionLoop::new(self.experiment.settings);

        let storage = self.experiment.prepare_storage()?;
        log::info!("Recording to {}", storage.display());
        self.sinks = Some(ChannelSinks {
            ch1: ChannelSink::create(&self.experiment.channel1_path)?,
            ch2: ChannelSink::create(&self.experiment.channel2_path)?,
        });
        let sensor_sink = match sensor {
            Some(_) => Some(SensorSink::create(
                &self.experiment.sensor_path,
                self.config.sensor.mode,
            )?),
            None => None,
        };

        self.backend.set_decimation(self.experiment.decimation)?;
        self.backend.set_trigger_delay(self.experiment.trigger_delay)?;

        if let (Some(transport), Some(sink)) = (sensor, sensor_sink) {
            self.start_sensor(transport, sink)?;
        } else {
            log::info!("Attitude sensor disabled");
        }

        self.rig.program()?;
        self.rig.enable_ramping()?;

        self.backend.start_sampling()?;
        self.clock.sleep(self.experiment.settings.budget.buffer_fill_time());
        self.backend.set_trigger_source(TriggerSource::ExternalRising)?;
        self.rig.trigger()?;
        Ok(())
    }

    fn start_sensor<T>(&mut self, transport: T, sink: SensorSink) -> Result<()>
    where
        T: Transport + 'static,
    {
        let sensor = &self.config.sensor;
        let client = RegisterClient::new(transport).with_response_polls(sensor.response_polls);
        let mut session = SensorSession::new(client, self.heartbeat.clone());
        session.bring_up(sensor)?;
        let (transport, reader) = session.into_parts();

        self.active.store(true, Ordering::Relaxed);
        let active = Arc::clone(&self.active);
        let heartbeat = self.heartbeat.clone();
        let handle = thread::Builder::new()
            .name("um7-reader".to_string())
            .spawn(move || background_task(transport, reader, sink, active, heartbeat))
            .map_err(|e| Error::Other(format!("Failed to spawn UM7 reader thread: {}", e)))?;
        self.reader = Some(handle);
        Ok(())
    }

    /// Run the capture loop to the target ramp count
    pub fn acquire(&mut self) -> Result<Counters> {
        let sinks = self
            .sinks
            .as_mut()
            .ok_or_else(|| Error::Other("acquire called before start".to_string()))?;
        self.acquisition.run(&mut self.backend, &self.clock, sinks)
    }

    /// Tear down in reverse and report
    ///
    /// Every step runs even if an earlier one failed; the first error is
    /// returned after the rest of the teardown.
    pub fn stop(&mut self) -> Result<Summary> {
        let mut first_error: Option<Error> = None;
        let mut keep = |result: Result<()>| {
            if let Err(e) = result {
                log::error!("Shutdown step failed: {}", e);
                first_error.get_or_insert(e);
            }
        };

        self.active.store(false, Ordering::Relaxed);
        let mut reader_stats = None;
        if let Some(handle) = self.reader.take() {
            match handle.join() {
                Ok(Ok(stats)) => reader_stats = Some(stats),
                Ok(Err(e)) => keep(Err(e)),
                Err(_) => keep(Err(Error::ThreadPanic)),
            }
        }

        let mut bytes_written = reader_stats.map_or(0, |s| s.bytes_written);
        if let Some(mut sinks) = self.sinks.take() {
            match sinks.finish() {
                Ok(bytes) => bytes_written += bytes,
                Err(e) => keep(Err(e)),
            }
        }

        keep(self.rig.disable_ramping());

        let summary = Summary {
            target_ramp_count: self.experiment.settings.target_ramp_count,
            counters: self.acquisition.counters(),
            timing: self.acquisition.timing(),
            bytes_written,
            storage_dir: self.experiment.storage_dir.clone(),
            heartbeat: self.heartbeat.latest(),
            reader: reader_stats,
        };
        summary.log();

        match first_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    pub fn experiment(&self) -> &Experiment {
        &self.experiment
    }

    pub fn counters(&self) -> Counters {
        self.acquisition.counters()
    }

    pub fn heartbeat(&self) -> &SharedHeartbeat {
        &self.heartbeat
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn rig(&self) -> &SynthRig<S> {
        &self.rig
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
