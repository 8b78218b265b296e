//! Fixed instruction prompts sent with every image.

/// Prompt asking whether an image is a MALDI imaging figure.
/// The reply must carry `IS_MALDI:`, `CONFIDENCE:` and `REASON:` lines.
pub const CLASSIFY_PROMPT: &str = r#"Analyze this image and determine if it contains MALDI (Matrix-Assisted Laser Desorption/Ionization) imaging mass spectrometry data.

MALDI imaging figures typically show:
- Spatial distribution maps of metabolites/molecules in tissue sections
- Color-coded intensity maps overlaid on tissue images
- Mass-to-charge (m/z) value annotations
- Multiple panels showing different m/z values
- Ion intensity heatmaps
- Keywords: "MALDI", "MSI", "IMS", "mass spectrometry imaging", m/z ratios

Answer in this EXACT format:
IS_MALDI: [YES/NO]
CONFIDENCE: [0-100]
REASON: [brief explanation]

Be strict - only answer YES if confident this is MALDI imaging data, not regular microscopy, western blots, or other biochemistry figures."#;

/// Prompt asking for a pipe-delimited listing of every annotated peak.
pub const EXTRACT_PROMPT: &str = r#"Please analyze this MALDI imaging mass spectrometry image and extract ALL annotations.

For each annotated peak, provide:
- m/z value (exact number)
- Metabolite/molecule name
- Any tissue type mentioned
- Any other relevant notes

Format your response as a structured list, one annotation per line:
m/z: [value] | Metabolite: [name] | Tissue: [type] | Notes: [info]

Be precise with m/z values and metabolite names."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_prompt_names_markers() {
        for marker in ["IS_MALDI:", "CONFIDENCE:", "REASON:"] {
            assert!(CLASSIFY_PROMPT.contains(marker), "missing {}", marker);
        }
    }

    #[test]
    fn test_extract_prompt_shows_line_format() {
        assert!(EXTRACT_PROMPT.contains("m/z: [value] | Metabolite: [name]"));
    }
}
