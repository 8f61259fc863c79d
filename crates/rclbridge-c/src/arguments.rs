// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Command line parsing for `--ros-args` sections.
//!
//! Everything between `--ros-args` and the next `--` (or the end of the
//! vector) is interpreted; everything else is kept as unparsed application
//! arguments, in order.

const ROS_ARGS_FLAG: &str = "--ros-args";
const ROS_ARGS_END: &str = "--";

/// Arguments extracted from a process argument vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArguments {
    pub remaps: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
    pub params_files: Vec<String>,
    pub log_level: Option<String>,
    pub enclave: Option<String>,
    pub unparsed: Vec<String>,
}

/// Parse failure; the message becomes the native diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentError(pub String);

fn split_assignment(flag: &str, value: &str) -> Result<(String, String), ArgumentError> {
    match value.split_once(":=") {
        Some((lhs, rhs)) if !lhs.is_empty() => Ok((lhs.to_string(), rhs.to_string())),
        _ => Err(ArgumentError(format!(
            "couldn't parse '{}' after '{}': expected 'name:=value'",
            value, flag
        ))),
    }
}

pub fn parse_arguments(args: &[String]) -> Result<ParsedArguments, ArgumentError> {
    let mut parsed = ParsedArguments::default();
    let mut in_ros_args = false;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if !in_ros_args {
            if arg == ROS_ARGS_FLAG {
                in_ros_args = true;
            } else {
                parsed.unparsed.push(arg.clone());
            }
            continue;
        }

        match arg.as_str() {
            ROS_ARGS_END => in_ros_args = false,
            ROS_ARGS_FLAG => {}
            flag @ ("-r" | "--remap" | "-p" | "--param" | "--log-level" | "-e" | "--enclave"
            | "--params-file") => {
                let Some(value) = iter.next() else {
                    return Err(ArgumentError(format!(
                        "argument '{}' is missing its value",
                        flag
                    )));
                };
                match flag {
                    "-r" | "--remap" => parsed.remaps.push(split_assignment(flag, value)?),
                    "-p" | "--param" => parsed.params.push(split_assignment(flag, value)?),
                    "--log-level" => parsed.log_level = Some(value.clone()),
                    "-e" | "--enclave" => parsed.enclave = Some(value.clone()),
                    _ => parsed.params_files.push(value.clone()),
                }
            }
            other => {
                return Err(ArgumentError(format!(
                    "found unknown ROS argument '{}'",
                    other
                )));
            }
        }
    }

    Ok(parsed)
}
