// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use clap::Parser;

/// Operator configuration parsed from the command line
#[derive(Debug, Clone, Parser)]
#[command(name = "courier")]
#[command(about = "Propagates annotated ConfigMaps and Secrets to selected namespaces")]
pub struct Options {
    /// Enable leader election so only one replica reconciles at a time
    #[arg(long = "leader-elect", default_value_t = false)]
    pub leader_elect: bool,

    /// Address the Prometheus metrics endpoint binds to
    #[arg(long = "metrics-bind-address", default_value = "0.0.0.0:8080")]
    pub metrics_bind_address: String,

    /// Address the health probe endpoints bind to
    #[arg(long = "health-probe-bind-address", default_value = "0.0.0.0:8081")]
    pub health_probe_bind_address: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = Options::try_parse_from(["courier"]).unwrap();
        assert!(!opts.leader_elect);
        assert_eq!(opts.metrics_bind_address, "0.0.0.0:8080");
        assert_eq!(opts.health_probe_bind_address, "0.0.0.0:8081");
    }

    #[test]
    fn test_all_flags() {
        let opts = Options::try_parse_from([
            "courier",
            "--leader-elect",
            "--metrics-bind-address",
            "127.0.0.1:9090",
            "--health-probe-bind-address",
            "127.0.0.1:9091",
        ])
        .unwrap();
        assert!(opts.leader_elect);
        assert_eq!(opts.metrics_bind_address, "127.0.0.1:9090");
        assert_eq!(opts.health_probe_bind_address, "127.0.0.1:9091");
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Options::try_parse_from(["courier", "--no-such-flag"]).is_err());
    }
}
