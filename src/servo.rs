// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the servo::Servo type.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use nalgebra::Isometry3;
use tracing::error;

use crate::exception::{ServoException, ServoResult};
use crate::model::KinematicModel;
use crate::servo::config::ServoConfig;
use crate::servo::control_loop::ServoLoop;
use crate::servo::control_types::{JointState, RealtimeConfig, ServoPublisher};
use crate::servo::state::{CommandHandle, LatestState};

pub mod config;
pub(crate) mod control_loop;
pub mod control_types;
pub mod low_pass_filter;
pub mod rate_limiting;
mod singularity;
pub mod state;
pub mod status;

/// On Linux a realtime kernel announces itself through `/sys/kernel/realtime`.
fn has_realtime_kernel() -> bool {
    Path::new("/sys/kernel/realtime").exists()
}

/// Puts the calling servo loop thread under SCHED_FIFO and locks its memory.
///
/// A tick must finish inside one publish period even while producer threads
/// hammer the command handle, so the loop thread gets scheduled ahead of them
/// and must never take a page fault mid-tick. Requires an rtprio limit for the
/// user, e.g. in /etc/security/limits.conf.
fn make_loop_thread_realtime() -> ServoResult<()> {
    fn realtime_error(message: &str) -> ServoException {
        ServoException::RealTimeException {
            message: format!("servo-rs: {}", message),
        }
    }
    unsafe {
        let max_priority = libc::sched_get_priority_max(libc::SCHED_FIFO);
        if max_priority == -1 {
            return Err(realtime_error("unable to query the SCHED_FIFO priority range"));
        }
        // One below the maximum so watchdog kernel threads still win
        let param = libc::sched_param {
            sched_priority: max_priority - 1,
        };
        if libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) != 0 {
            return Err(realtime_error(
                "unable to switch the servo loop thread to SCHED_FIFO",
            ));
        }
        if libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) != 0 {
            return Err(realtime_error("unable to lock the servo loop's memory"));
        }
    }
    Ok(())
}

/// Realtime Cartesian and joint-space servoing for one move group of an
/// articulated arm.
///
/// Commands and joint states are pushed in asynchronously through the
/// [`CommandHandle`]; a periodic loop on a dedicated thread turns the latest
/// command into one outgoing trajectory point per publish period, honoring
/// joint position, velocity and acceleration limits, decelerating near
/// singularities and scaling velocity for imminent collisions.
///
/// `start` and `stop` can be called repeatedly. Stopping joins the loop
/// thread and keeps its state, so a later start resumes with warm filters.
pub struct Servo {
    config: Arc<ServoConfig>,
    shared: Arc<LatestState>,
    realtime_config: RealtimeConfig,
    servo_loop: Option<ServoLoop>,
    loop_thread: Option<JoinHandle<ServoLoop>>,
}

impl Servo {
    /// Creates a servo from a validated configuration, a kinematic model of
    /// the move group and a publisher for the outgoing topics.
    ///
    /// # Errors
    /// * [`ConfigException`](`ServoException::ConfigException`) if the
    ///   configuration violates one of its rules.
    /// * [`ModelException`](`ServoException::ModelException`) if the move
    ///   group has no active joints.
    pub fn new(
        config: ServoConfig,
        model: Box<dyn KinematicModel>,
        publisher: Box<dyn ServoPublisher>,
        realtime_config: RealtimeConfig,
    ) -> ServoResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let shared = Arc::new(LatestState::new());
        let servo_loop = ServoLoop::new(
            Arc::clone(&config),
            model,
            publisher,
            Arc::clone(&shared),
        )?;
        Ok(Servo {
            config,
            shared,
            realtime_config,
            servo_loop: Some(servo_loop),
            loop_thread: None,
        })
    }

    /// The handle the transport layer pushes commands and joint states through.
    pub fn handle(&self) -> CommandHandle {
        CommandHandle::new(Arc::clone(&self.shared))
    }

    /// Blocks until a joint state has been received, or until the timeout
    /// expires. Returns whether a joint state is available.
    pub fn wait_for_initialized(&self, timeout: Duration) -> bool {
        let handle = self.handle();
        let start = Instant::now();
        loop {
            if handle.latest_joint_state().is_some() {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Arms the periodic servo loop on its own thread.
    ///
    /// # Errors
    /// * [`CommandException`](`ServoException::CommandException`) if no joint
    ///   state has been received yet.
    /// * [`RealTimeException`](`ServoException::RealTimeException`) if
    ///   realtime scheduling is enforced but the kernel has no realtime
    ///   capabilities, or the thread cannot be spawned.
    pub fn start(&mut self) -> ServoResult<()> {
        if self.loop_thread.is_some() {
            return Ok(());
        }
        if self.realtime_config == RealtimeConfig::Enforce && !has_realtime_kernel() {
            return Err(ServoException::RealTimeException {
                message: "servo-rs: Running kernel does not have realtime capabilities."
                    .to_string(),
            });
        }
        let mut servo_loop = self.servo_loop.take().ok_or_else(|| {
            ServoException::CommandException {
                message: "servo loop state is unavailable".to_string(),
            }
        })?;
        if let Err(error) = servo_loop.start() {
            self.servo_loop = Some(servo_loop);
            return Err(error);
        }

        self.shared.stop_requested.store(false, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let period = Duration::from_secs_f64(self.config.publish_period);
        let realtime_config = self.realtime_config;
        let thread = std::thread::Builder::new()
            .name("servo-loop".to_string())
            .spawn(move || {
                if realtime_config == RealtimeConfig::Enforce {
                    if let Err(error) = make_loop_thread_realtime() {
                        error!("{}", error);
                    }
                }
                let mut next_tick = Instant::now() + period;
                loop {
                    if shared.stop_requested.load(Ordering::SeqCst) {
                        break;
                    }
                    servo_loop.tick(Instant::now());
                    let now = Instant::now();
                    if next_tick > now {
                        std::thread::sleep(next_tick - now);
                    }
                    // Overrun ticks catch up without sleeping
                    next_tick += period;
                }
                servo_loop
            })
            .map_err(|error| ServoException::RealTimeException {
                message: format!("servo-rs: unable to spawn the servo loop thread: {}", error),
            });
        match thread {
            Ok(handle) => {
                self.loop_thread = Some(handle);
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    /// Stops the periodic loop. The next scheduled tick bails out before
    /// publishing; the loop state is kept for a later restart.
    pub fn stop(&mut self) {
        self.shared.stop_requested.store(true, Ordering::SeqCst);
        if let Some(handle) = self.loop_thread.take() {
            match handle.join() {
                Ok(servo_loop) => self.servo_loop = Some(servo_loop),
                Err(_) => error!("the servo loop thread panicked"),
            }
        }
    }

    /// Whether the periodic loop is currently armed.
    pub fn is_running(&self) -> bool {
        self.loop_thread.is_some()
    }

    /// Pauses or unpauses servoing. A paused loop keeps ticking and
    /// publishing status but emits no commands.
    pub fn set_paused(&self, paused: bool) {
        self.shared.paused.store(paused, Ordering::SeqCst);
    }

    /// Honors or zeroes individual Cartesian input dimensions,
    /// `[lin_x, lin_y, lin_z, ang_x, ang_y, ang_z]`. Takes effect on the next
    /// tick.
    pub fn change_control_dimensions(&self, dimensions: [bool; 6]) {
        self.handle().change_control_dimensions(dimensions);
    }

    /// Allows or forbids drift in individual Cartesian dimensions. A drifting
    /// dimension is removed from the Jacobian, trading its tracking for the
    /// task's redundancy. Takes effect on the next tick.
    pub fn change_drift_dimensions(&self, dimensions: [bool; 6]) {
        self.handle().change_drift_dimensions(dimensions);
    }

    /// Transform from the planning frame to the robot link command frame, or
    /// `None` if no tick has computed it yet.
    pub fn get_command_frame_transform(&self) -> Option<Isometry3<f64>> {
        self.handle().command_frame_transform()
    }

    /// The latest joint state pushed in, if any.
    pub fn get_latest_joint_state(&self) -> Option<JointState> {
        self.handle().latest_joint_state()
    }
}

impl Drop for Servo {
    fn drop(&mut self) {
        self.stop();
    }
}
