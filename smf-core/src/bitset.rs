use serde::{Deserialize, Serialize};

const WORD: usize = 64;

/// Growable bit vector, one bit per block position.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    pub fn new(len: usize) -> Self {
        Self { words: vec![0; len.div_ceil(WORD)], len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Out-of-range positions read as unset.
    pub fn get(&self, i: usize) -> bool {
        if i >= self.len {
            return false;
        }
        self.words.get(i / WORD).is_some_and(|w| w & (1 << (i % WORD)) != 0)
    }

    /// Word storage matches `len` and no bit is set past the end.
    pub fn is_well_formed(&self) -> bool {
        if self.words.len() != self.len.div_ceil(WORD) {
            return false;
        }
        let tail = self.len % WORD;
        match self.words.last() {
            Some(&last) if tail != 0 => last >> tail == 0,
            _ => true,
        }
    }

    /// Set bit `i`, growing the vector if needed. Returns true if the bit changed.
    pub fn set(&mut self, i: usize) -> bool {
        if i >= self.len {
            let Some(len) = i.checked_add(1) else {
                return false;
            };
            self.grow(len);
        }
        let w = &mut self.words[i / WORD];
        let mask = 1u64 << (i % WORD);
        let was = *w & mask != 0;
        *w |= mask;
        !was
    }

    /// Clear bit `i`. Returns true if the bit changed.
    pub fn clear(&mut self, i: usize) -> bool {
        if i >= self.len {
            return false;
        }
        let w = &mut self.words[i / WORD];
        let mask = 1u64 << (i % WORD);
        let was = *w & mask != 0;
        *w &= !mask;
        was
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Extend to at least `len` bits; never shrinks.
    pub fn grow(&mut self, len: usize) {
        if len <= self.len {
            return;
        }
        self.words.resize(len.div_ceil(WORD), 0);
        self.len = len;
    }

    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.get(i))
    }
}
