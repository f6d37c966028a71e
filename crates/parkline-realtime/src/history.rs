//! 점유 이력 로그.
//!
//! 수락된 이미지 분석 스냅샷의 최근 N건 (최신순, 최대 크기 제한).

use parkline_core::models::occupancy::HistoryEntry;
use std::collections::VecDeque;

/// 점유 이력 (최신순)
#[derive(Debug, Clone)]
pub struct OccupancyHistory {
    entries: VecDeque<HistoryEntry>,
    max_size: usize,
}

impl OccupancyHistory {
    /// 새 이력 생성
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// 저장된 목록으로 복원 (최신순으로 저장되어 있다고 가정, 초과분은 버림)
    pub fn from_entries(entries: Vec<HistoryEntry>, max_size: usize) -> Self {
        let mut entries: VecDeque<HistoryEntry> = entries.into();
        entries.truncate(max_size);
        Self { entries, max_size }
    }

    /// 맨 앞에 추가, 가장 오래된 항목부터 밀어냄
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.max_size);
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// 최신순 목록
    pub fn to_vec(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use parkline_core::models::occupancy::ParkingStatus;

    fn entry(minute: i64) -> HistoryEntry {
        HistoryEntry {
            timestamp: Utc.timestamp_opt(1_800_000_000, 0).unwrap() + Duration::minutes(minute),
            available_spaces: 3,
            occupied_spaces: 3,
            occupancy_rate: 50.0,
            parking_status: ParkingStatus::Limited,
        }
    }

    #[test]
    fn newest_first() {
        let mut history = OccupancyHistory::new(10);
        history.push(entry(1));
        history.push(entry(2));
        history.push(entry(3));

        let entries = history.to_vec();
        assert_eq!(entries[0], entry(3));
        assert_eq!(entries[2], entry(1));
    }

    #[test]
    fn bounded_length() {
        let mut history = OccupancyHistory::new(3);
        for minute in 0..10 {
            history.push(entry(minute));
            assert!(history.to_vec().len() <= 3);
        }
        assert_eq!(history.to_vec(), vec![entry(9), entry(8), entry(7)]);
    }

    #[test]
    fn restore_truncates_to_bound() {
        let stored: Vec<HistoryEntry> = (0..5).rev().map(entry).collect();
        let history = OccupancyHistory::from_entries(stored, 2);
        assert_eq!(history.to_vec(), vec![entry(4), entry(3)]);
    }

    #[test]
    fn zero_bound_keeps_nothing() {
        let mut history = OccupancyHistory::new(0);
        history.push(entry(1));
        assert!(history.is_empty());
    }
}
