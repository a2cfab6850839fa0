use crate::error::VisionError;
use image::GrayImage;

/// Raw OCR output as parallel arrays, one entry per detection index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrData {
    pub text: Vec<String>,
    pub conf: Vec<i32>,
    pub left: Vec<i32>,
    pub top: Vec<i32>,
    pub width: Vec<i32>,
    pub height: Vec<i32>,
}

/// One row of `OcrData`
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection<'a> {
    pub text: &'a str,
    pub conf: i32,
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl OcrData {
    pub fn push(&mut self, text: impl Into<String>, conf: i32, left: i32, top: i32, width: i32, height: i32) {
        self.text.push(text.into());
        self.conf.push(conf);
        self.left.push(left);
        self.top.push(top);
        self.width.push(width);
        self.height.push(height);
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Iterate detections in engine emission order
    pub fn iter(&self) -> impl Iterator<Item = RawDetection<'_>> {
        (0..self.len()).map(move |i| RawDetection {
            text: &self.text[i],
            conf: self.conf[i],
            left: self.left[i],
            top: self.top[i],
            width: self.width[i],
            height: self.height[i],
        })
    }

    /// Parse Tesseract's TSV report.
    ///
    /// Columns: level, page_num, block_num, par_num, line_num, word_num,
    /// left, top, width, height, conf, text. Structural rows (page, block,
    /// line) carry `conf = -1` and no text; they are kept so indices line up
    /// with the engine's own numbering.
    pub fn from_tsv(tsv: &str) -> Result<Self, VisionError> {
        let mut data = Self::default();

        for (line_no, line) in tsv.lines().enumerate() {
            if line.trim().is_empty() || line.starts_with("level") {
                continue;
            }

            let fields: Vec<&str> = line.splitn(12, '\t').collect();
            if fields.len() < 11 {
                return Err(VisionError::Ocr(format!(
                    "Malformed TSV row {}: expected 12 columns, got {}",
                    line_no + 1,
                    fields.len()
                )));
            }

            let int_field = |idx: usize| -> Result<i32, VisionError> {
                fields[idx].trim().parse::<i32>().map_err(|e| {
                    VisionError::Ocr(format!("Bad TSV value '{}' on row {}: {}", fields[idx], line_no + 1, e))
                })
            };

            // Tesseract 4 writes integer confidences, Tesseract 5 writes floats
            let conf = fields[10]
                .trim()
                .parse::<f32>()
                .map_err(|e| VisionError::Ocr(format!("Bad TSV confidence on row {}: {}", line_no + 1, e)))?
                as i32;

            data.push(
                fields.get(11).copied().unwrap_or_default(),
                conf,
                int_field(6)?,
                int_field(7)?,
                int_field(8)?,
                int_field(9)?,
            );
        }

        Ok(data)
    }
}

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs", "tesseract")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Extract text, confidence (0-100) and pixel boxes from a binary image
    fn extract(&self, image: &GrayImage) -> Result<OcrData, VisionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
1\t1\t0\t0\t0\t0\t0\t0\t200\t80\t-1\t\n\
5\t1\t1\t1\t1\t1\t10\t10\t40\t15\t92.481\tEXIT\n\
5\t1\t1\t1\t1\t2\t60\t10\t8\t15\t12\t \n";

    #[test]
    fn test_from_tsv_keeps_every_row_in_order() {
        let data = OcrData::from_tsv(SAMPLE_TSV).unwrap();

        assert_eq!(data.len(), 3);
        assert_eq!(data.conf, vec![-1, 92, 12]);
        assert_eq!(data.text[1], "EXIT");
        assert_eq!((data.left[1], data.top[1], data.width[1], data.height[1]), (10, 10, 40, 15));
    }

    #[test]
    fn test_from_tsv_rejects_short_rows() {
        let result = OcrData::from_tsv("5\t1\t1\n");
        assert!(matches!(result, Err(VisionError::Ocr(_))));
    }

    #[test]
    fn test_iter_yields_rows() {
        let mut data = OcrData::default();
        data.push("OK", 85, 1, 2, 3, 4);

        let rows: Vec<_> = data.iter().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text, "OK");
        assert_eq!(rows[0].conf, 85);
    }
}
