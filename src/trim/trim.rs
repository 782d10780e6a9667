use crate::read::Record;

/// How a matched read is cut at the barcode position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TrimPolicy {
    /// Cut sequence and quality at the same offset, keeping them the same length
    #[default]
    SeqAndQual,
    /// Cut only the sequence and leave the quality line as read
    SeqOnly,
}

impl TrimPolicy {
    /// Drop everything before `offset`, the barcode itself is kept
    pub fn apply(self, record: &mut Record, offset: usize) {
        cut_front(&mut record.seq, offset);
        if self == TrimPolicy::SeqAndQual {
            cut_front(&mut record.qual, offset);
        }
    }
}

fn cut_front(line: &mut Vec<u8>, offset: usize) {
    let offset = offset.min(line.len());
    line.drain(..offset);
}
