use std::cmp::min;
use human_repr::HumanCount;
use kdam::{term, tqdm, Bar, BarExt};

use crate::ffmpeg::statistics::Statistics;
use crate::progress::ProgressUpdate;

pub const INITIAL_TEXT: &str = "Encoding video";

/// Modal progress display for the running job. A dismissed dialog is not
/// shown again; the session creates a fresh one for the next job.
pub trait ProgressDialog {
    fn show(&mut self);
    fn update(&mut self, update: &ProgressUpdate, statistics: &Statistics);
    fn dismiss(&mut self);
}

/// Short, non-blocking message to the user.
pub trait Notifier {
    fn toast(&self, msg: &str);
}

pub struct KdamDialog {
    text: String,
    bar: Option<Bar>,
}

impl KdamDialog {
    pub fn new(text: &str) -> Self {
        KdamDialog {
            text: String::from(text),
            bar: None,
        }
    }
}

impl ProgressDialog for KdamDialog {
    fn show(&mut self) {
        if self.bar.is_some() {
            return;
        }
        term::init(false);
        self.bar = Some(tqdm!(
            total = 100,
            desc = self.text.clone(),
            position = 0,
            force_refresh = true
        ));
    }

    fn update(&mut self, update: &ProgressUpdate, statistics: &Statistics) {
        if let Some(pbar) = self.bar.as_mut() {
            pbar.set_description(&update.text);
            pbar.set_postfix(format!("{} {:.2}x", statistics.size.human_count_bytes(), statistics.speed));
            let _ = pbar.update_to(min(update.percentage, 100) as usize);
        }
    }

    fn dismiss(&mut self) {
        if let Some(mut pbar) = self.bar.take() {
            let _ = pbar.clear();
            eprintln!();
        }
    }
}

pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn toast(&self, msg: &str) {
        println!("{}", msg);
    }
}
