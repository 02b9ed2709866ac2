//! Janela deslizante de amostras para médias e picos.

use std::collections::VecDeque;
use wrench_core::types::{Sample, Vector3, Wrench};

pub struct SampleWindow {
    wrenches: VecDeque<Wrench>,
    capacity: usize,
    last: Option<Sample>,
    total: u64,
    since_report: u64,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            wrenches: VecDeque::with_capacity(capacity),
            capacity,
            last: None,
            total: 0,
            since_report: 0,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        if self.wrenches.len() == self.capacity {
            self.wrenches.pop_front();
        }
        self.wrenches.push_back(sample.wrench);
        self.last = Some(sample);
        self.total += 1;
        self.since_report += 1;
    }

    pub fn last(&self) -> Option<&Sample> {
        self.last.as_ref()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Amostras recebidas desde a última chamada.
    pub fn take_since_report(&mut self) -> u64 {
        std::mem::take(&mut self.since_report)
    }

    /// Média componente a componente da janela.
    pub fn mean(&self) -> Option<Wrench> {
        if self.wrenches.is_empty() {
            return None;
        }
        let mut sum = [0.0; 6];
        for w in &self.wrenches {
            for (acc, v) in sum.iter_mut().zip(w.to_array()) {
                *acc += v;
            }
        }
        let n = self.wrenches.len() as f64;
        Some(Wrench::from_array(sum.map(|v| v / n)))
    }

    /// Maior módulo de força na janela.
    pub fn peak_force(&self) -> f64 {
        self.wrenches
            .iter()
            .map(|w| w.force.norm())
            .fold(0.0, f64::max)
    }
}

/// Formata um vetor para o console.
pub fn fmt_vec(v: &Vector3) -> String {
    format!("({:+9.3}, {:+9.3}, {:+9.3})", v.x, v.y, v.z)
}
