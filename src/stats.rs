use std::fmt;
use std::time::Duration;

/// Timings and compared-point counters for one or more join runs.
///
/// Ratio fields accumulate one per-run average per call, so printing after
/// `n` runs divides by `joined_func_count`. Timing fields are only
/// populated by the entry points whose flag bundle enables them.
#[derive(Debug, Clone)]
pub struct JoinStats {
    pub method: &'static str,
    pub total_runtime: Duration,
    pub ds_create_points_time: Duration,
    pub ds_build_time: Duration,
    pub ds_query_time: Duration,
    pub ds_query_fetch_time: Duration,

    pub expected_compared_points: f64,
    pub compared_points: f64,
    pub compared_in_bound_points: f64,
    pub compared_edge_points: f64,
    pub compared_brute_force: f64,

    pub ds_pts: u64,
    pub total_pts: u64,
    pub total_queries: u64,

    pub joined_func_count: u32,
    pub brute_force_count: f64,
}

impl JoinStats {
    pub fn new(method: &'static str) -> Self {
        JoinStats {
            method,
            total_runtime: Duration::ZERO,
            ds_create_points_time: Duration::ZERO,
            ds_build_time: Duration::ZERO,
            ds_query_time: Duration::ZERO,
            ds_query_fetch_time: Duration::ZERO,
            expected_compared_points: 0.0,
            compared_points: 0.0,
            compared_in_bound_points: 0.0,
            compared_edge_points: 0.0,
            compared_brute_force: 0.0,
            ds_pts: 0,
            total_pts: 0,
            total_queries: 0,
            joined_func_count: 0,
            brute_force_count: 0.0,
        }
    }
}

impl Default for JoinStats {
    fn default() -> Self {
        JoinStats::new("default")
    }
}

impl fmt::Display for JoinStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bar = "====================================================================";
        if self.joined_func_count > 0 {
            let runs = self.joined_func_count as f64;
            writeln!(f, "{bar}")?;
            writeln!(f, "Runs Statistics")?;
            writeln!(f, "{bar}")?;
            writeln!(f, "Method:                           {}", self.method)?;
            writeln!(f, "Run count:                        {}", self.joined_func_count)?;
            writeln!(
                f,
                "Average Compared Point:           {}",
                self.compared_points / runs
            )?;
            writeln!(
                f,
                "Average Expected Compare Point:   {}",
                self.expected_compared_points / runs
            )?;
            writeln!(f, "DS PTS count:                     {}", self.ds_pts)?;
            writeln!(f, "Total PTS count:                  {}", self.total_pts)?;
            writeln!(f, "Total Queries:                    {}", self.total_queries)?;
        }
        writeln!(f, "{bar}")?;
        writeln!(f, "Time Statistics")?;
        writeln!(f, "{bar}")?;
        writeln!(
            f,
            "Total runtime (seconds):               {}",
            self.total_runtime.as_secs_f64()
        )?;
        writeln!(
            f,
            "Total DS create points time (seconds): {}",
            self.ds_create_points_time.as_secs_f64()
        )?;
        writeln!(
            f,
            "Total DS build time (seconds):         {}",
            self.ds_build_time.as_secs_f64()
        )?;
        writeln!(
            f,
            "Total query time (seconds):            {}",
            self.ds_query_time.as_secs_f64()
        )?;
        write!(
            f,
            "Total query fetch time (seconds):      {}",
            self.ds_query_fetch_time.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_method_after_runs() {
        let mut stats = JoinStats::new("Simple");
        let text = format!("{stats}");
        assert!(!text.contains("Method:"), "no run section before any run");
        stats.joined_func_count = 1;
        let text = format!("{stats}");
        assert!(text.contains("Method:                           Simple"));
        assert!(text.contains("Time Statistics"));
    }
}
