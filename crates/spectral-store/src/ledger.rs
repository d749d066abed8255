//! Tracks which pixels of a region have been written.

use synth_common::{Pixel, PixelRegion};

use crate::error::{Result, StoreError};

/// Write-once bookkeeping over a pixel region.
#[derive(Debug, Clone)]
pub struct WriteLedger {
    region: PixelRegion,
    written: Vec<bool>,
    count: usize,
}

impl WriteLedger {
    pub fn new(region: PixelRegion) -> Self {
        let written = vec![false; region.pixel_count()];
        Self {
            region,
            written,
            count: 0,
        }
    }

    pub fn region(&self) -> &PixelRegion {
        &self.region
    }

    /// Record a write. Fails if the pixel is outside the region or was
    /// already written.
    pub fn mark(&mut self, pixel: Pixel) -> Result<()> {
        let offset = self
            .region
            .offset(pixel)
            .ok_or(StoreError::OutsideRegion(pixel))?;

        if std::mem::replace(&mut self.written[offset], true) {
            return Err(StoreError::DuplicateWrite(pixel));
        }
        self.count += 1;
        Ok(())
    }

    /// Record a run of `len` pixels along row `start.y`, beginning at `start`.
    ///
    /// Nothing is marked unless every pixel of the run can be.
    pub fn mark_segment(&mut self, start: Pixel, len: usize) -> Result<()> {
        let mut offsets = Vec::with_capacity(len);
        for i in 0..len {
            let pixel = Pixel::new(start.x + i, start.y);
            let offset = self
                .region
                .offset(pixel)
                .ok_or(StoreError::OutsideRegion(pixel))?;
            if self.written[offset] {
                return Err(StoreError::DuplicateWrite(pixel));
            }
            offsets.push(offset);
        }

        for offset in offsets {
            self.written[offset] = true;
        }
        self.count += len;
        Ok(())
    }

    pub fn is_written(&self, pixel: Pixel) -> bool {
        self.region
            .offset(pixel)
            .map(|i| self.written[i])
            .unwrap_or(false)
    }

    pub fn written_count(&self) -> usize {
        self.count
    }

    pub fn missing_count(&self) -> usize {
        self.written.len() - self.count
    }

    /// Fails with [`StoreError::MissingPixels`] unless every pixel was written.
    pub fn ensure_complete(&self) -> Result<()> {
        let first = self
            .region
            .pixels()
            .zip(&self.written)
            .find(|(_, &done)| !done)
            .map(|(pixel, _)| pixel);

        match first {
            None => Ok(()),
            Some(first) => Err(StoreError::MissingPixels {
                missing: self.missing_count(),
                first,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_once() {
        let mut ledger = WriteLedger::new(PixelRegion::new(2..4, 1..3));
        ledger.mark(Pixel::new(2, 1)).unwrap();
        assert!(ledger.is_written(Pixel::new(2, 1)));
        assert!(matches!(
            ledger.mark(Pixel::new(2, 1)),
            Err(StoreError::DuplicateWrite(_))
        ));
        assert_eq!(ledger.written_count(), 1);
    }

    #[test]
    fn test_outside_region() {
        let mut ledger = WriteLedger::new(PixelRegion::new(2..4, 1..3));
        assert!(matches!(
            ledger.mark(Pixel::new(0, 1)),
            Err(StoreError::OutsideRegion(_))
        ));
    }

    #[test]
    fn test_mark_segment_is_all_or_nothing() {
        let mut ledger = WriteLedger::new(PixelRegion::new(0..4, 0..2));
        ledger.mark(Pixel::new(2, 1)).unwrap();

        assert!(matches!(
            ledger.mark_segment(Pixel::new(0, 1), 4),
            Err(StoreError::DuplicateWrite(p)) if p == Pixel::new(2, 1)
        ));
        assert!(!ledger.is_written(Pixel::new(0, 1)));
        assert_eq!(ledger.written_count(), 1);

        assert!(matches!(
            ledger.mark_segment(Pixel::new(2, 0), 3),
            Err(StoreError::OutsideRegion(_))
        ));
        assert_eq!(ledger.written_count(), 1);

        ledger.mark_segment(Pixel::new(0, 0), 4).unwrap();
        assert_eq!(ledger.written_count(), 5);
        assert!(ledger.is_written(Pixel::new(3, 0)));
    }

    #[test]
    fn test_ensure_complete_reports_first_missing() {
        let region = PixelRegion::new(0..2, 0..2);
        let mut ledger = WriteLedger::new(region.clone());
        ledger.mark(Pixel::new(0, 0)).unwrap();
        ledger.mark(Pixel::new(1, 0)).unwrap();
        ledger.mark(Pixel::new(1, 1)).unwrap();

        match ledger.ensure_complete() {
            Err(StoreError::MissingPixels { missing, first }) => {
                assert_eq!(missing, 1);
                assert_eq!(first, Pixel::new(0, 1));
            }
            other => panic!("unexpected {:?}", other),
        }

        ledger.mark(Pixel::new(0, 1)).unwrap();
        assert!(ledger.ensure_complete().is_ok());
    }
}
