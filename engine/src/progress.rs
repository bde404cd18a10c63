//! 进度回调
//!
//! 调用方传入的回调只会收到 0..=100 之间、单调不减的整数；
//! 成功结束时保证最后一次回调为 100。

pub struct Progress<'a> {
    sink: Option<&'a mut dyn FnMut(u8)>,
    last: u8,
    reported: bool,
}

impl<'a> Progress<'a> {
    pub fn new(sink: Option<&'a mut dyn FnMut(u8)>) -> Self {
        Self {
            sink,
            last: 0,
            reported: false,
        }
    }

    pub fn report(&mut self, percent: u8) {
        let percent = percent.min(100).max(self.last);
        self.last = percent;
        self.reported = true;

        if let Some(sink) = self.sink.as_mut() {
            sink(percent);
        }
    }

    /// 若尚未报告 100，则补报一次
    pub fn finish(&mut self) {
        if !self.reported || self.last < 100 {
            self.report(100);
        }
    }
}

/// `round(done / total * 100)`，上限 100；`total == 0` 视为已完成
pub fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }

    let scaled = (u128::from(done) * 100 + u128::from(total) / 2) / u128::from(total);
    scaled.min(100) as u8
}
