/// One block of `-progress` output from a running job.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statistics {
    pub execution_id: u64,
    pub frame: u64,
    pub fps: f64,
    /// Bytes written so far.
    pub size: u64,
    /// Output timestamp reached, in milliseconds.
    pub time_ms: i64,
    /// kbit/s
    pub bitrate: f64,
    pub speed: f64,
}

impl Statistics {
    pub fn new(execution_id: u64) -> Self {
        Statistics {
            execution_id,
            ..Default::default()
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum ProgressLine {
    Continue,
    Render,
    End,
}

/// Folds one `key=value` line into `stats`. `progress=` closes a block.
pub fn handle_progress_line(line: &str, stats: &mut Statistics) -> ProgressLine {
    let Some((key, value)) = line.trim().split_once('=') else {
        return ProgressLine::Continue;
    };
    let value = value.trim();
    match key {
        "frame" => stats.frame = value.parse().unwrap_or(stats.frame),
        "fps" => stats.fps = value.parse().unwrap_or(stats.fps),
        "total_size" => stats.size = value.parse().unwrap_or(stats.size),
        // ffmpeg reports microseconds under both names
        "out_time_us" | "out_time_ms" => {
            stats.time_ms = value.parse::<i64>().map(|us| us / 1000).unwrap_or(stats.time_ms)
        },
        "bitrate" => stats.bitrate = value.trim_end_matches("kbits/s").parse().unwrap_or(stats.bitrate),
        "speed" => stats.speed = value.trim_end_matches('x').parse().unwrap_or(stats.speed),
        "progress" => {
            return match value {
                "end" => ProgressLine::End,
                _ => ProgressLine::Render,
            }
        },
        _ => (),
    }
    ProgressLine::Continue
}
