//! Scales mapping rows and timestamps to canvas coordinates.

use std::collections::HashMap;

/// Ordinal scale giving each row id a vertical band of uniform height.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandScale {
    domain: Vec<String>,
    index: HashMap<String, usize>,
    bandwidth: f64,
    offset: f64,
}

impl BandScale {
    /// `offset` reserves space above the first band (the time axis).
    pub fn new<I>(
        domain: I,
        bandwidth: f64,
        offset: f64,
    ) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let domain: Vec<String> = domain.into_iter().collect();
        let index = domain.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
        Self {
            domain,
            index,
            bandwidth: bandwidth.max(0.0),
            offset,
        }
    }

    /// Top edge of the band for `id`.
    pub fn position(
        &self,
        id: &str,
    ) -> Option<f64> {
        self.index.get(id).map(|i| self.offset + *i as f64 * self.bandwidth)
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    pub fn len(&self) -> usize {
        self.domain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domain.is_empty()
    }

    /// Total height including the axis offset.
    pub fn height(&self) -> f64 {
        self.offset + self.domain.len() as f64 * self.bandwidth
    }

    /// Row id whose band contains `y`.
    pub fn invert(
        &self,
        y: f64,
    ) -> Option<&str> {
        if self.bandwidth <= 0.0 || y < self.offset {
            return None;
        }
        let i = ((y - self.offset) / self.bandwidth).floor() as usize;
        self.domain.get(i).map(String::as_str)
    }
}

/// Linear scale from epoch milliseconds to horizontal pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeScale {
    domain: (i64, i64),
    range: (f64, f64),
}

impl TimeScale {
    pub fn new(
        domain: (i64, i64),
        range: (f64, f64),
    ) -> Self {
        Self {
            domain,
            range,
        }
    }

    pub fn domain(&self) -> (i64, i64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Maps a timestamp to x. A degenerate domain maps everything to the range start.
    ///
    /// Computed in floating point so any `i64` domain is accepted.
    pub fn apply(
        &self,
        t: i64,
    ) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return r0;
        }
        r0 + (t as f64 - d0 as f64) / (d1 as f64 - d0 as f64) * (r1 - r0)
    }

    pub fn invert(
        &self,
        x: f64,
    ) -> i64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return d0;
        }
        (d0 as f64 + ((x - r0) / (r1 - r0) * (d1 as f64 - d0 as f64)).round()) as i64
    }

    /// Evenly spaced timestamps inside the domain on a 1-2-5 millisecond progression.
    pub fn ticks(
        &self,
        count: usize,
    ) -> Vec<i64> {
        let (d0, d1) = self.domain;
        if d1 <= d0 || count == 0 {
            return vec![d0];
        }

        let step = i128::from(nice_step((d1 as f64 - d0 as f64) / count as f64));
        let (d0, d1) = (i128::from(d0), i128::from(d1));
        let mut tick = d0.div_euclid(step) * step;
        if tick < d0 {
            tick += step;
        }
        let mut ticks = Vec::new();
        while tick <= d1 {
            ticks.push(tick as i64);
            tick += step;
        }
        ticks
    }
}

fn nice_step(raw: f64) -> i64 {
    if raw <= 1.0 {
        return 1;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let nice = if residual >= 50f64.sqrt() {
        10.0
    } else if residual >= 10f64.sqrt() {
        5.0
    } else if residual >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    (nice * magnitude).round() as i64
}
