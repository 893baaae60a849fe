use indicatif::{ProgressBar, ProgressStyle};
use crate::core::manager::QueueStats;

// 结构体：ProgressManager
// 用于管理整批上传的聚合进度条
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    // 构造函数：进度条以平均进度（0-100）为刻度
    pub fn new(total_tasks: usize) -> Self {
        let bar = ProgressBar::new(100);
        if let Ok(style) =
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
        {
            bar.set_style(style);
        }
        bar.set_message(format!("0/{} 完成", total_tasks));
        ProgressManager { bar }
    }

    // 方法：按最新统计刷新进度条
    pub fn update(&self, stats: &QueueStats, total_tasks: usize) {
        self.bar.set_position(stats.average_progress.round() as u64);

        let mut status = format!("{}/{} 完成", stats.completed, total_tasks);
        if stats.uploading > 0 {
            status.push_str(&format!(" | {} 上传中", stats.uploading));
        }
        if stats.failed > 0 {
            status.push_str(&format!(" | {} 失败", stats.failed));
        }
        self.bar.set_message(status);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
