// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the servo configuration and its validation rules.

use serde::Deserialize;
use std::fs::read_to_string;
use std::path::Path;

use crate::exception::{ServoException, ServoResult};

/// Units of incoming twist and joint jog commands.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub enum CommandInType {
    /// Components are in \[-1, 1\] and scaled by the configured
    /// `linear_scale` / `rotational_scale` / `joint_scale`.
    #[serde(rename = "unitless")]
    Unitless,
    /// Components are in \[m/s\] and \[rad/s\].
    #[serde(rename = "speed_units")]
    SpeedUnits,
}

/// Shape of the outgoing command.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub enum CommandOutType {
    /// A joint trajectory with one point per tick.
    #[serde(rename = "trajectory")]
    Trajectory,
    /// A bare float array carrying positions or velocities.
    #[serde(rename = "multiarray")]
    Multiarray,
}

/// Configuration of a [`Servo`](`crate::Servo`). Immutable after construction.
///
/// Loadable from TOML via [`ServoConfig::load`]; every rule of
/// [`ServoConfig::validate`] is enforced before a servo is built.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
    /// Tick period in seconds. Must be greater than zero.
    pub publish_period: f64,
    /// Units of incoming commands.
    pub command_in_type: CommandInType,
    /// Shape of outgoing commands.
    pub command_out_type: CommandOutType,
    /// Include positions in the outgoing command.
    pub publish_joint_positions: bool,
    /// Include velocities in the outgoing command.
    pub publish_joint_velocities: bool,
    /// Include an all-zero acceleration vector in the outgoing command. Some
    /// controllers reject trajectory points without one.
    pub publish_joint_accelerations: bool,
    /// Max linear speed in \[m/s\] a unitless command of magnitude 1 maps to.
    pub linear_scale: f64,
    /// Max rotational speed in \[rad/s\] a unitless command of magnitude 1 maps to.
    pub rotational_scale: f64,
    /// Max joint speed in \[rad/s\] a unitless jog of magnitude 1 maps to.
    pub joint_scale: f64,
    /// Coefficient of the position low-pass filters. Must be at least 1;
    /// 1 disables filtering, larger values smooth more.
    pub low_pass_filter_coeff: f64,
    /// Age in seconds past which a stamped command counts as stale.
    pub incoming_command_timeout: f64,
    /// How many halt messages to publish once all commands have gone zero or
    /// stale. 0 keeps republishing forever.
    pub num_outgoing_halt_msgs_to_publish: u32,
    /// Jacobian condition number at which deceleration starts.
    pub lower_singularity_threshold: f64,
    /// Jacobian condition number at which motion is halted. Must be at least
    /// `lower_singularity_threshold`.
    pub hard_stop_singularity_threshold: f64,
    /// Distance in \[rad\] or \[m\] to a position bound at which the loop halts.
    pub joint_limit_margin: f64,
    /// Frame all servoing calculations run in.
    pub planning_frame: String,
    /// Frame incoming twists without a `frame_id` are expressed in.
    pub robot_link_command_frame: String,
    /// Move group the servo drives.
    pub move_group_name: String,
    /// Duplicate the outgoing trajectory point for the strict message-timing
    /// requirements of a Gazebo simulation.
    pub use_gazebo: bool,
}

impl Default for ServoConfig {
    fn default() -> Self {
        ServoConfig {
            publish_period: 0.01,
            command_in_type: CommandInType::Unitless,
            command_out_type: CommandOutType::Trajectory,
            publish_joint_positions: true,
            publish_joint_velocities: true,
            publish_joint_accelerations: false,
            linear_scale: 0.4,
            rotational_scale: 0.8,
            joint_scale: 0.5,
            low_pass_filter_coeff: 2.0,
            incoming_command_timeout: 0.1,
            num_outgoing_halt_msgs_to_publish: 4,
            lower_singularity_threshold: 17.0,
            hard_stop_singularity_threshold: 30.0,
            joint_limit_margin: 0.1,
            planning_frame: String::new(),
            robot_link_command_frame: String::new(),
            move_group_name: String::new(),
            use_gazebo: false,
        }
    }
}

impl ServoConfig {
    /// Parses and validates a configuration from a TOML string.
    pub fn from_toml_str(contents: &str) -> ServoResult<Self> {
        let config: ServoConfig =
            toml::from_str(contents).map_err(|e| ServoException::ConfigException {
                message: format!("unable to parse servo configuration: {}", e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> ServoResult<Self> {
        let contents = read_to_string(path).map_err(|e| ServoException::ConfigException {
            message: format!("unable to read servo configuration file: {}", e),
        })?;
        ServoConfig::from_toml_str(&contents)
    }

    /// Checks every configuration rule, returning a
    /// [`ConfigException`](`ServoException::ConfigException`) naming the first
    /// rule that fails.
    pub fn validate(&self) -> ServoResult<()> {
        if !(self.publish_period > 0.0) || !self.publish_period.is_finite() {
            return Err(config_error("'publish_period' must be greater than zero"));
        }
        if !self.publish_joint_positions
            && !self.publish_joint_velocities
            && !self.publish_joint_accelerations
        {
            return Err(config_error(
                "at least one of publish_joint_positions / publish_joint_velocities / \
                 publish_joint_accelerations must be true",
            ));
        }
        if self.command_out_type == CommandOutType::Multiarray
            && self.publish_joint_positions == self.publish_joint_velocities
        {
            return Err(config_error(
                "multiarray output requires exactly one of publish_joint_positions and \
                 publish_joint_velocities",
            ));
        }
        if !(self.low_pass_filter_coeff >= 1.0) || !self.low_pass_filter_coeff.is_finite() {
            return Err(config_error("'low_pass_filter_coeff' must be at least 1"));
        }
        if !(self.incoming_command_timeout >= 0.0) {
            return Err(config_error(
                "'incoming_command_timeout' must not be negative",
            ));
        }
        if !(self.lower_singularity_threshold > 0.0)
            || !(self.hard_stop_singularity_threshold > 0.0)
        {
            return Err(config_error(
                "'lower_singularity_threshold' and 'hard_stop_singularity_threshold' must be \
                 greater than zero",
            ));
        }
        if self.hard_stop_singularity_threshold < self.lower_singularity_threshold {
            return Err(config_error(
                "'hard_stop_singularity_threshold' must be at least \
                 'lower_singularity_threshold'",
            ));
        }
        if !(self.joint_limit_margin >= 0.0) {
            return Err(config_error("'joint_limit_margin' must not be negative"));
        }
        if self.planning_frame.is_empty() {
            return Err(config_error("'planning_frame' must be set"));
        }
        if self.robot_link_command_frame.is_empty() {
            return Err(config_error("'robot_link_command_frame' must be set"));
        }
        if self.move_group_name.is_empty() {
            return Err(config_error("'move_group_name' must be set"));
        }
        Ok(())
    }
}

fn config_error(message: &str) -> ServoException {
    ServoException::ConfigException {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn valid_config() -> ServoConfig {
        ServoConfig {
            planning_frame: "base_link".to_string(),
            robot_link_command_frame: "ee_link".to_string(),
            move_group_name: "arm".to_string(),
            ..ServoConfig::default()
        }
    }

    #[test]
    fn default_config_misses_frames() {
        assert!(ServoConfig::default().validate().is_err());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn rejects_nonpositive_period() {
        let mut config = valid_config();
        config.publish_period = 0.0;
        assert!(config.validate().is_err());
        config.publish_period = -0.01;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_all_publish_flags_false() {
        let mut config = valid_config();
        config.publish_joint_positions = false;
        config.publish_joint_velocities = false;
        config.publish_joint_accelerations = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn multiarray_needs_exactly_one_field() {
        let mut config = valid_config();
        config.command_out_type = CommandOutType::Multiarray;
        assert!(config.validate().is_err());

        config.publish_joint_velocities = false;
        assert!(config.validate().is_ok());

        config.publish_joint_positions = false;
        config.publish_joint_accelerations = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_filter_coeff_below_one() {
        let mut config = valid_config();
        config.low_pass_filter_coeff = 0.5;
        assert!(config.validate().is_err());
        config.low_pass_filter_coeff = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_singularity_thresholds() {
        let mut config = valid_config();
        config.lower_singularity_threshold = 40.0;
        assert!(config.validate().is_err());
        config.lower_singularity_threshold = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_toml() {
        let config = ServoConfig::from_toml_str(
            r#"
            publish_period = 0.004
            command_in_type = "speed_units"
            command_out_type = "multiarray"
            publish_joint_positions = false
            planning_frame = "base_link"
            robot_link_command_frame = "ee_link"
            move_group_name = "arm"
            "#,
        )
        .unwrap();
        assert_eq!(config.publish_period, 0.004);
        assert_eq!(config.command_in_type, CommandInType::SpeedUnits);
        assert_eq!(config.command_out_type, CommandOutType::Multiarray);
        assert!(!config.publish_joint_positions);
        // Unset keys keep their defaults
        assert_eq!(config.num_outgoing_halt_msgs_to_publish, 4);
    }

    #[test]
    fn toml_parse_error_is_config_exception() {
        let error = ServoConfig::from_toml_str("publish_period = \"fast\"").unwrap_err();
        assert!(matches!(
            error,
            ServoException::ConfigException { .. }
        ));
    }
}
