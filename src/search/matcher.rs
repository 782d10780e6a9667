use crate::barcodes::BarcodeTable;
use crate::read::Record;
use memchr::memmem::Finder;

/// Which read carried which half of the barcode pair
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Reverse barcode in R1, forward barcode in R2 (always the case for single-end)
    Forward,
    /// Forward barcode in R1, reverse barcode in R2
    Swapped,
}

/// Sample assignment and where to cut each read
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchResult<'a> {
    pub sample_id: usize,
    pub sample: &'a str,
    pub trim_offset_r1: usize,
    pub trim_offset_r2: Option<usize>,
    pub orientation: Orientation,
}

struct CompiledEntry {
    forward: Finder<'static>,
    reverse: Finder<'static>,
    sample: String,
    sample_id: usize,
}

/// Exact substring search of a barcode table, first entry in table order wins.
pub struct BarcodeMatcher {
    entries: Vec<CompiledEntry>,
}

impl BarcodeMatcher {
    pub fn new(table: &BarcodeTable) -> Self {
        let entries = table
            .entries()
            .iter()
            .map(|e| CompiledEntry {
                forward: Finder::new(&e.forward).into_owned(),
                reverse: Finder::new(&e.reverse).into_owned(),
                sample: e.sample.clone(),
                sample_id: e.sample_id,
            })
            .collect();
        Self { entries }
    }

    /// Single-end: the first entry whose forward barcode occurs in the read
    pub fn match_single(&self, record: &Record) -> Option<MatchResult<'_>> {
        self.entries.iter().find_map(|entry| {
            entry.forward.find(&record.seq).map(|pos| MatchResult {
                sample_id: entry.sample_id,
                sample: &entry.sample,
                trim_offset_r1: pos,
                trim_offset_r2: None,
                orientation: Orientation::Forward,
            })
        })
    }

    /// Paired-end: per entry try R-in-R1/F-in-R2, then F-in-R1/R-in-R2
    pub fn match_pair(&self, r1: &Record, r2: &Record) -> Option<MatchResult<'_>> {
        self.entries.iter().find_map(|entry| {
            let (offset_r1, offset_r2, orientation) = Self::forward_hit(entry, r1, r2)
                .map(|(a, b)| (a, b, Orientation::Forward))
                .or_else(|| Self::swapped_hit(entry, r1, r2).map(|(a, b)| (a, b, Orientation::Swapped)))?;

            Some(MatchResult {
                sample_id: entry.sample_id,
                sample: &entry.sample,
                trim_offset_r1: offset_r1,
                trim_offset_r2: Some(offset_r2),
                orientation,
            })
        })
    }

    fn forward_hit(entry: &CompiledEntry, r1: &Record, r2: &Record) -> Option<(usize, usize)> {
        let in_r1 = entry.reverse.find(&r1.seq)?;
        let in_r2 = entry.forward.find(&r2.seq)?;
        Some((in_r1, in_r2))
    }

    fn swapped_hit(entry: &CompiledEntry, r1: &Record, r2: &Record) -> Option<(usize, usize)> {
        let in_r2 = entry.reverse.find(&r2.seq)?;
        let in_r1 = entry.forward.find(&r1.seq)?;
        Some((in_r1, in_r2))
    }
}
