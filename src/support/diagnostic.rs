//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Mimewalk.
//
// Mimewalk is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Mimewalk is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Mimewalk. If not, see <http://www.gnu.org/licenses/>.

use std::collections::BTreeMap;
use std::sync::Mutex;

use log::warn;

/// Receives monitoring events which do not affect the outcome of a parse.
pub trait Diagnostics: Send + Sync {
    /// A part declared a charset which is not supported.
    fn unsupported_charset(&self, charset: &str);
}

/// Discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDiagnostics;

impl Diagnostics for NoDiagnostics {
    fn unsupported_charset(&self, _: &str) {}
}

/// Counts unsupported charsets by name.
///
/// Names are kept exactly as declared (other than surrounding whitespace), so
/// `X-Foo` and `x-foo` are tracked separately.
#[derive(Debug, Default)]
pub struct CharsetCounters {
    counts: Mutex<BTreeMap<String, u64>>,
}

impl CharsetCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, charset: &str) -> u64 {
        self.counts
            .lock()
            .map(|c| c.get(charset).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counts.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Diagnostics for CharsetCounters {
    fn unsupported_charset(&self, charset: &str) {
        let charset = charset.trim();
        warn!("unsupported charset {:?}", charset);
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(charset.to_owned()).or_insert(0) += 1;
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use rayon::prelude::*;

    use super::*;

    #[test]
    fn counts_per_name() {
        let counters = CharsetCounters::new();
        counters.unsupported_charset("x-klingon");
        counters.unsupported_charset(" x-klingon ");
        counters.unsupported_charset("x-vulcan");

        assert_eq!(2, counters.count("x-klingon"));
        assert_eq!(1, counters.count("x-vulcan"));
        assert_eq!(0, counters.count("utf-8"));
        assert_eq!(2, counters.snapshot().len());
    }

    #[test]
    fn counts_across_threads() {
        let counters = Arc::new(CharsetCounters::new());
        (0..100).into_par_iter().for_each(|_| {
            counters.unsupported_charset("x-klingon");
        });
        assert_eq!(100, counters.count("x-klingon"));
    }
}
