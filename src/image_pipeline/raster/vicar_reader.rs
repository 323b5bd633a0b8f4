//! VICAR raster reader.
//!
//! Reads JPL VICAR images, either bare or embedded behind a PDS3 attached label
//! (as distributed for Mars rover cameras). The file layout is:
//!
//! - an ASCII label of `LBLSIZE` bytes,
//! - `NLB` binary header records,
//! - `NB * NL` image records of `RECSIZE` bytes, each starting with `NBB` bytes of
//!   binary prefix followed by `NS` samples.
//!
//! Only band-sequential (`ORG='BSQ'`) images are supported.

use tracing::{debug, warn};

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::raster::label::VicarLabel;
use crate::image_pipeline::raster::reader::RasterReader;
use crate::image_pipeline::raster::types::{ElementKind, RasterSamples, RawRaster};

/// VICAR reader. Stateless; one instance can decode any number of files.
pub struct VicarReader;

const LBLSIZE_KEY: &[u8] = b"LBLSIZE=";

/// Bands beyond this count are dropped; the normalizer maps at most R, G, B.
const MAX_BANDS: usize = 3;

impl RasterReader for VicarReader {
    fn read_raster(&self, data: &[u8]) -> Result<RawRaster> {
        debug!("Decoding VICAR image, {} bytes", data.len());

        let label_start = locate_vicar_label(data)?;
        if label_start > 0 {
            debug!("VICAR label found at byte {} behind a PDS label", label_start);
        }

        let label_size = read_label_size(&data[label_start..])?;
        let label_end = label_start
            .checked_add(label_size)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| {
                ConversionError::DecodeError(format!(
                    "label size {} exceeds file length {}",
                    label_size,
                    data.len()
                ))
            })?;

        let text = String::from_utf8_lossy(&data[label_start..label_end]);
        let label = VicarLabel::parse(&text)?;
        let layout = RecordLayout::from_label(&label)?;

        debug!(
            "VICAR layout: {}x{}x{} {:?}, big_endian={}, recsize={}, nbb={}, nlb={}",
            layout.samples,
            layout.lines,
            layout.bands,
            layout.kind,
            layout.big_endian,
            layout.record_size,
            layout.prefix_bytes,
            layout.header_records
        );

        let depth = if layout.bands > MAX_BANDS {
            warn!(
                "Image has {} bands, keeping the first {}",
                layout.bands, MAX_BANDS
            );
            MAX_BANDS
        } else {
            layout.bands
        };

        let data_start = layout
            .header_records
            .checked_mul(layout.record_size)
            .and_then(|header| header.checked_add(label_end))
            .ok_or_else(|| overflow("binary header size", layout.header_records))?;
        layout.check_length(data.len(), data_start, depth)?;

        let samples = layout.decode(data, data_start, depth);

        Ok(RawRaster {
            width: layout.samples,
            height: layout.lines,
            depth,
            samples,
        })
    }
}

/// Byte offset of the VICAR label: the file start, or the first `LBLSIZE=` when
/// the image is wrapped in a PDS3 label.
fn locate_vicar_label(data: &[u8]) -> Result<usize> {
    if data.starts_with(LBLSIZE_KEY) {
        return Ok(0);
    }
    data.windows(LBLSIZE_KEY.len())
        .position(|window| window == LBLSIZE_KEY)
        .ok_or_else(|| ConversionError::UnsupportedFormat("no VICAR label found".to_string()))
}

fn read_label_size(label: &[u8]) -> Result<usize> {
    let digits: String = label[LBLSIZE_KEY.len()..]
        .iter()
        .skip_while(|b| **b == b' ')
        .take_while(|b| b.is_ascii_digit())
        .map(|&b| b as char)
        .collect();

    match digits.parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(ConversionError::DecodeError(format!(
            "invalid LBLSIZE value '{}'",
            digits
        ))),
    }
}

fn overflow(what: &str, value: usize) -> ConversionError {
    ConversionError::DecodeError(format!("{} overflows for label value {}", what, value))
}

#[derive(Debug, Clone)]
struct RecordLayout {
    kind: ElementKind,
    big_endian: bool,
    lines: usize,
    samples: usize,
    bands: usize,
    record_size: usize,
    prefix_bytes: usize,
    header_records: usize,
}

impl RecordLayout {
    fn from_label(label: &VicarLabel) -> Result<Self> {
        let org = label.keyword_or("ORG", "BSQ")?;
        if org != "BSQ" {
            return Err(ConversionError::UnsupportedFormat(format!(
                "{} band organization, only BSQ is supported",
                org
            )));
        }

        let format = label.keyword_or("FORMAT", "BYTE")?;
        let kind = match format.as_str() {
            "BYTE" => ElementKind::U8,
            "HALF" | "WORD" => ElementKind::I16,
            "FULL" | "LONG" => ElementKind::I32,
            "REAL" => ElementKind::F32,
            "DOUB" => ElementKind::F64,
            other => {
                return Err(ConversionError::UnsupportedFormat(format!(
                    "VICAR sample format {}",
                    other
                )));
            }
        };

        let big_endian = if kind.is_float() {
            match label.keyword_or("REALFMT", "IEEE")?.as_str() {
                "IEEE" => true,
                "RIEEE" => false,
                other => {
                    return Err(ConversionError::UnsupportedFormat(format!(
                        "{} real format",
                        other
                    )));
                }
            }
        } else {
            match label.keyword_or("INTFMT", "HIGH")?.as_str() {
                "HIGH" => true,
                "LOW" => false,
                other => {
                    return Err(ConversionError::UnsupportedFormat(format!(
                        "{} integer format",
                        other
                    )));
                }
            }
        };

        let lines = label.require_usize("NL")?;
        let samples = label.require_usize("NS")?;
        let bands = label.usize_or("NB", 1)?;
        if bands == 0 {
            return Err(ConversionError::DecodeError("image has no bands".to_string()));
        }

        let prefix_bytes = label.usize_or("NBB", 0)?;
        let min_record = samples
            .checked_mul(kind.byte_width())
            .and_then(|line| line.checked_add(prefix_bytes))
            .ok_or_else(|| overflow("line size", samples))?;
        let record_size = label.usize_or("RECSIZE", min_record)?;
        if record_size < min_record {
            return Err(ConversionError::DecodeError(format!(
                "RECSIZE {} is smaller than one line of {} bytes",
                record_size, min_record
            )));
        }

        Ok(Self {
            kind,
            big_endian,
            lines,
            samples,
            bands,
            record_size,
            prefix_bytes,
            header_records: label.usize_or("NLB", 0)?,
        })
    }

    fn line_bytes(&self) -> usize {
        self.samples * self.kind.byte_width()
    }

    fn check_length(&self, file_len: usize, data_start: usize, depth: usize) -> Result<()> {
        let records = depth
            .checked_mul(self.lines)
            .ok_or_else(|| overflow("record count", self.lines))?;
        if records == 0 || self.samples == 0 {
            return Ok(());
        }
        // prefix + line fit in one record, checked in from_label
        let needed = (records - 1)
            .checked_mul(self.record_size)
            .and_then(|body| body.checked_add(data_start))
            .and_then(|body| body.checked_add(self.prefix_bytes + self.line_bytes()))
            .ok_or_else(|| overflow("image data size", self.record_size))?;
        if needed > file_len {
            return Err(ConversionError::DecodeError(format!(
                "image data truncated: need {} bytes, file has {}",
                needed, file_len
            )));
        }
        Ok(())
    }

    fn decode(&self, data: &[u8], data_start: usize, depth: usize) -> RasterSamples {
        let be = self.big_endian;
        match self.kind {
            ElementKind::U8 => RasterSamples::U8(self.read_records(data, data_start, depth, |b: [u8; 1]| b[0])),
            ElementKind::U16 => {
                let from: fn([u8; 2]) -> u16 = if be { u16::from_be_bytes } else { u16::from_le_bytes };
                RasterSamples::U16(self.read_records(data, data_start, depth, from))
            }
            ElementKind::I16 => {
                let from: fn([u8; 2]) -> i16 = if be { i16::from_be_bytes } else { i16::from_le_bytes };
                RasterSamples::I16(self.read_records(data, data_start, depth, from))
            }
            ElementKind::I32 => {
                let from: fn([u8; 4]) -> i32 = if be { i32::from_be_bytes } else { i32::from_le_bytes };
                RasterSamples::I32(self.read_records(data, data_start, depth, from))
            }
            ElementKind::F32 => {
                let from: fn([u8; 4]) -> f32 = if be { f32::from_be_bytes } else { f32::from_le_bytes };
                RasterSamples::F32(self.read_records(data, data_start, depth, from))
            }
            ElementKind::F64 => {
                let from: fn([u8; 8]) -> f64 = if be { f64::from_be_bytes } else { f64::from_le_bytes };
                RasterSamples::F64(self.read_records(data, data_start, depth, from))
            }
        }
    }

    /// Collects `depth * NL` records into one BSQ buffer. Bounds are checked by
    /// [`RecordLayout::check_length`] beforehand.
    fn read_records<T, const N: usize>(
        &self,
        data: &[u8],
        data_start: usize,
        depth: usize,
        from: impl Fn([u8; N]) -> T,
    ) -> Vec<T> {
        if self.samples == 0 {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(depth * self.lines * self.samples);
        for record in 0..depth * self.lines {
            let start = data_start + record * self.record_size + self.prefix_bytes;
            let line = &data[start..start + self.samples * N];
            out.extend(line.chunks_exact(N).map(|chunk| {
                let mut bytes = [0u8; N];
                bytes.copy_from_slice(chunk);
                from(bytes)
            }));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABEL_SIZE: usize = 256;

    fn vicar_file(label_body: &str, payload: &[u8]) -> Vec<u8> {
        let mut label = format!("LBLSIZE={:<8}{}", LABEL_SIZE, label_body).into_bytes();
        assert!(label.len() <= LABEL_SIZE);
        label.resize(LABEL_SIZE, b' ');
        label.extend_from_slice(payload);
        label
    }

    #[test]
    fn reads_big_endian_half_words() {
        let payload: Vec<u8> = [1i16, -2, 300, 1000]
            .iter()
            .flat_map(|v| v.to_be_bytes())
            .collect();
        let file = vicar_file(
            "FORMAT='HALF' ORG='BSQ' NL=2 NS=2 NB=1 RECSIZE=4 INTFMT='HIGH'",
            &payload,
        );

        let raster = VicarReader.read_raster(&file).unwrap();

        assert_eq!((raster.width, raster.height, raster.depth), (2, 2, 1));
        assert_eq!(raster.samples, RasterSamples::I16(vec![1, -2, 300, 1000]));
    }

    #[test]
    fn reads_little_endian_reals() {
        let payload: Vec<u8> = [0.5f32, 1.5, 2.5].iter().flat_map(|v| v.to_le_bytes()).collect();
        let file = vicar_file("FORMAT='REAL' NL=1 NS=3 NB=1 REALFMT='RIEEE'", &payload);

        let raster = VicarReader.read_raster(&file).unwrap();

        assert_eq!(raster.element_kind(), ElementKind::F32);
        assert_eq!(raster.samples, RasterSamples::F32(vec![0.5, 1.5, 2.5]));
    }

    #[test]
    fn reads_doubles_and_longs() {
        let doubles: Vec<u8> = [4.0f64, 8.0].iter().flat_map(|v| v.to_be_bytes()).collect();
        let raster = VicarReader
            .read_raster(&vicar_file("FORMAT='DOUB' NL=1 NS=2", &doubles))
            .unwrap();
        assert_eq!(raster.samples, RasterSamples::F64(vec![4.0, 8.0]));

        let longs: Vec<u8> = [70000i32, -1].iter().flat_map(|v| v.to_le_bytes()).collect();
        let raster = VicarReader
            .read_raster(&vicar_file("FORMAT='FULL' NL=1 NS=2 INTFMT='LOW'", &longs))
            .unwrap();
        assert_eq!(raster.samples, RasterSamples::I32(vec![70000, -1]));
    }

    #[test]
    fn skips_binary_header_and_prefix_bytes() {
        // one 4-byte binary header record, then two 4-byte records with a 1-byte prefix
        let payload = [9, 9, 9, 9, 0xAA, 1, 2, 3, 0xBB, 4, 5, 6];
        let file = vicar_file(
            "FORMAT='BYTE' ORG='BSQ' NL=2 NS=3 NB=1 RECSIZE=4 NBB=1 NLB=1",
            &payload,
        );

        let raster = VicarReader.read_raster(&file).unwrap();

        assert_eq!(raster.samples, RasterSamples::U8(vec![1, 2, 3, 4, 5, 6]));
    }

    #[test]
    fn keeps_band_order() {
        let payload = [1u8, 2, 10, 20, 100, 200];
        let file = vicar_file("FORMAT='BYTE' NL=1 NS=2 NB=3", &payload);

        let raster = VicarReader.read_raster(&file).unwrap();

        assert_eq!(raster.depth, 3);
        assert_eq!(raster.samples, RasterSamples::U8(payload.to_vec()));
    }

    #[test]
    fn truncates_to_three_bands() {
        let payload = [1u8, 2, 3, 4, 5];
        let file = vicar_file("FORMAT='BYTE' NL=1 NS=1 NB=5", &payload);

        let raster = VicarReader.read_raster(&file).unwrap();

        assert_eq!(raster.depth, 3);
        assert_eq!(raster.samples, RasterSamples::U8(vec![1, 2, 3]));
    }

    #[test]
    fn finds_label_behind_pds_header() {
        let mut file = b"PDS_VERSION_ID = PDS3\r\nRECORD_TYPE = FIXED_LENGTH\r\nEND\r\n".to_vec();
        file.extend(vicar_file("FORMAT='BYTE' NL=1 NS=2", &[7, 8]));

        let raster = VicarReader.read_raster(&file).unwrap();

        assert_eq!(raster.samples, RasterSamples::U8(vec![7, 8]));
    }

    #[test]
    fn rejects_non_bsq_organization() {
        let file = vicar_file("FORMAT='BYTE' ORG='BIL' NL=1 NS=2 NB=2", &[0; 4]);
        let result = VicarReader.read_raster(&file);
        assert!(matches!(result, Err(ConversionError::UnsupportedFormat(_))));
    }

    #[test]
    fn rejects_complex_samples() {
        let file = vicar_file("FORMAT='COMP' NL=1 NS=1", &[0; 8]);
        let result = VicarReader.read_raster(&file);
        assert!(matches!(result, Err(ConversionError::UnsupportedFormat(_))));
    }

    #[test]
    fn rejects_truncated_data() {
        let file = vicar_file("FORMAT='HALF' NL=2 NS=2", &[0; 6]);
        let result = VicarReader.read_raster(&file);
        assert!(matches!(result, Err(ConversionError::DecodeError(_))));
    }

    #[test]
    fn rejects_files_without_label() {
        let result = VicarReader.read_raster(b"not an image");
        assert!(matches!(result, Err(ConversionError::UnsupportedFormat(_))));
    }

    #[test]
    fn rejects_label_larger_than_file() {
        let result = VicarReader.read_raster(b"LBLSIZE=4096 NL=1");
        assert!(matches!(result, Err(ConversionError::DecodeError(_))));
    }

    #[test]
    fn rejects_label_sizes_that_overflow() {
        let huge_line = vicar_file("FORMAT='DOUB' NL=2 NS=4611686018427387904", &[0; 16]);
        assert!(matches!(
            VicarReader.read_raster(&huge_line),
            Err(ConversionError::DecodeError(_))
        ));

        let huge_header = vicar_file(
            "FORMAT='BYTE' NL=1 NS=4 RECSIZE=4 NLB=4611686018427387904",
            &[0; 8],
        );
        assert!(matches!(
            VicarReader.read_raster(&huge_header),
            Err(ConversionError::DecodeError(_))
        ));

        let huge_body = vicar_file(
            "FORMAT='BYTE' NL=4611686018427387904 NS=4 NB=3 RECSIZE=4",
            &[0; 8],
        );
        assert!(matches!(
            VicarReader.read_raster(&huge_body),
            Err(ConversionError::DecodeError(_))
        ));
    }
}
