//! 操作员状态摘要
//!
//! 序列号、批次、采集时间与完整的组合状态，供 [`Robot::pretty_print`](crate::Robot::pretty_print)
//! 写入日志。

use chrono::{DateTime, Local};
use std::fmt;
use stretch_status::{CompositeStatus, Subsystem};

/// 某一时刻的状态摘要
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub serial_no: String,
    pub batch_name: String,
    pub captured_at: DateTime<Local>,
    pub status: CompositeStatus,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "##################### HELLO ROBOT #####################")?;
        writeln!(f, "Time      {}", self.captured_at.format("%Y-%m-%d %H:%M:%S%.3f"))?;
        writeln!(f, "Serial No {}", self.serial_no)?;
        writeln!(f, "Batch     {}", self.batch_name)?;
        writeln!(f, "---- Status ----")?;
        for subsystem in Subsystem::ALL {
            writeln!(
                f,
                "{}: {:#}",
                subsystem.name(),
                self.status.get(subsystem).as_value()
            )?;
        }
        writeln!(f, "timestamps:")?;
        for (source, stamp) in self.status.timestamps.iter() {
            if stamp.is_set() {
                writeln!(f, "  {}: {:.6}", source.name(), stamp.as_secs_f64())?;
            } else {
                writeln!(f, "  {}: unset", source.name())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stretch_status::{ClockSource, SubsystemStatus, SystemTimestamp};

    #[test]
    fn test_report_lists_header_and_every_subsystem() {
        let mut status = CompositeStatus::default();
        status.set(Subsystem::Lift, SubsystemStatus(json!({ "pos": 0.42 })));
        status
            .timestamps
            .set(ClockSource::LiftEnc, SystemTimestamp::from_micros(1_500_000));

        let report = StatusReport {
            serial_no: "stretch-re2-1042".to_string(),
            batch_name: "hank".to_string(),
            captured_at: Local::now(),
            status,
        };
        let text = report.to_string();

        assert!(text.contains("Serial No stretch-re2-1042"));
        assert!(text.contains("Batch     hank"));
        for subsystem in Subsystem::ALL {
            assert!(text.contains(&format!("{}:", subsystem.name())));
        }
        assert!(text.contains("\"pos\": 0.42"));
        assert!(text.contains("lift_enc: 1.500000"));
        assert!(text.contains("hw_sync: unset"));
    }
}
