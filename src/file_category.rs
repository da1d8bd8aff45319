/// File categorization for organizing a folder's top-level entries.
///
/// This module maps a file's duplicate status, size class and extension to
/// a single destination category. The classification is total and
/// order-sensitive and never touches the filesystem.
///
/// # Examples
///
/// ```
/// use dirjanitor::file_category::{Category, FileMapper};
/// use dirjanitor::inspect::SizeClass;
///
/// let mapper = FileMapper::default();
/// assert_eq!(mapper.categorize(false, SizeClass::Normal, Some("png")), Category::Images);
/// assert_eq!(mapper.categorize(false, SizeClass::Empty, Some("png")), Category::EmptyFiles);
/// assert_eq!(mapper.categorize(true, SizeClass::Huge, Some("png")), Category::Duplicates);
/// ```
use crate::inspect::SizeClass;
use std::collections::HashMap;

/// Represents a destination category.
///
/// Every non-skipped top-level entry lands in exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Plain text (.txt)
    TextFiles,
    /// Comma-separated values (.csv)
    CsvFiles,
    /// Images (JPG, PNG, GIF, BMP)
    Images,
    /// Office documents and PDFs
    Documents,
    /// Audio and video
    Media,
    /// Source code and web files
    Code,
    /// Anything with an unrecognized extension
    OtherFiles,
    /// Zero-byte files
    EmptyFiles,
    /// Files above the large threshold
    LargeFiles,
    /// Files above the huge threshold
    HugeFiles,
    /// Content already seen earlier in the same run
    Duplicates,
    /// Directories moved wholesale
    Folders,
}

impl Category {
    /// Every category, in the order the flat layout creates them.
    pub const ALL: [Category; 12] = [
        Category::TextFiles,
        Category::CsvFiles,
        Category::Folders,
        Category::Images,
        Category::Documents,
        Category::Media,
        Category::Code,
        Category::OtherFiles,
        Category::LargeFiles,
        Category::HugeFiles,
        Category::EmptyFiles,
        Category::Duplicates,
    ];

    /// Returns the configuration key for this category.
    ///
    /// The key doubles as the default directory name.
    ///
    /// # Examples
    ///
    /// ```
    /// use dirjanitor::file_category::Category;
    ///
    /// assert_eq!(Category::Images.key(), "images");
    /// assert_eq!(Category::OtherFiles.key(), "other_files");
    /// assert_eq!(Category::Duplicates.key(), "duplicates");
    /// ```
    pub fn key(&self) -> &'static str {
        match self {
            Category::TextFiles => "text_files",
            Category::CsvFiles => "csv_files",
            Category::Images => "images",
            Category::Documents => "documents",
            Category::Media => "media",
            Category::Code => "code",
            Category::OtherFiles => "other_files",
            Category::EmptyFiles => "empty_files",
            Category::LargeFiles => "large_files",
            Category::HugeFiles => "huge_files",
            Category::Duplicates => "duplicates",
            Category::Folders => "folders",
        }
    }

    /// Looks a category up by its configuration key.
    pub fn from_key(key: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.key() == key)
    }

    /// Returns the short label used in action log lines.
    pub fn description(&self) -> &'static str {
        match self {
            Category::TextFiles => ".txt file",
            Category::CsvFiles => ".csv file",
            Category::Images => "image",
            Category::Documents => "document",
            Category::Media => "media",
            Category::Code => "code file",
            Category::OtherFiles => "other file",
            Category::EmptyFiles => "empty file",
            Category::LargeFiles => "large file",
            Category::HugeFiles => "huge file",
            Category::Duplicates => "duplicate",
            Category::Folders => "folder",
        }
    }
}

/// Maps file extensions to type categories.
///
/// Lookups are case-insensitive exact matches on the extension without its
/// leading dot.
#[derive(Debug, Clone)]
pub struct FileMapper {
    extension_map: HashMap<String, Category>,
}

impl FileMapper {
    /// Creates a new `FileMapper` with the standard extension table.
    pub fn new() -> Self {
        let mut mapper = Self {
            extension_map: HashMap::new(),
        };
        mapper.populate_standard_mappings();
        mapper
    }

    fn populate_standard_mappings(&mut self) {
        self.add_extension_mapping("txt", Category::TextFiles);
        self.add_extension_mapping("csv", Category::CsvFiles);

        for ext in ["jpg", "jpeg", "png", "gif", "bmp"] {
            self.add_extension_mapping(ext, Category::Images);
        }
        for ext in ["pdf", "docx", "xlsx", "pptx", "rtf"] {
            self.add_extension_mapping(ext, Category::Documents);
        }
        for ext in ["mp4", "avi", "mp3", "wav", "mov"] {
            self.add_extension_mapping(ext, Category::Media);
        }
        for ext in ["py", "js", "html", "css", "java"] {
            self.add_extension_mapping(ext, Category::Code);
        }
    }

    /// Adds a file extension to category mapping.
    pub fn add_extension_mapping(&mut self, ext: &str, category: Category) {
        self.extension_map
            .insert(ext.trim_start_matches('.').to_lowercase(), category);
    }

    /// Maps a file extension to a type category.
    ///
    /// # Examples
    ///
    /// ```
    /// use dirjanitor::file_category::{Category, FileMapper};
    ///
    /// let mapper = FileMapper::default();
    /// assert_eq!(mapper.extension_to_category("pdf"), Some(Category::Documents));
    /// assert_eq!(mapper.extension_to_category("MP3"), Some(Category::Media));
    /// assert_eq!(mapper.extension_to_category("xyz"), None);
    /// ```
    pub fn extension_to_category(&self, ext: &str) -> Option<Category> {
        self.extension_map.get(&ext.to_lowercase()).copied()
    }

    /// Determines the category for a file.
    ///
    /// Precedence is fixed:
    /// 1. Already-seen content goes to `Duplicates`
    /// 2. `Empty`, `Huge` and `Large` size classes go to their size folders
    /// 3. The extension table decides the type folder
    /// 4. Anything left goes to `OtherFiles`
    pub fn categorize(&self, duplicate: bool, size: SizeClass, ext: Option<&str>) -> Category {
        if duplicate {
            return Category::Duplicates;
        }

        match size {
            SizeClass::Empty => return Category::EmptyFiles,
            SizeClass::Huge => return Category::HugeFiles,
            SizeClass::Large => return Category::LargeFiles,
            SizeClass::Normal => {}
        }

        ext.and_then(|e| self.extension_to_category(e))
            .unwrap_or(Category::OtherFiles)
    }
}

impl Default for FileMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_keys_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_key(category.key()), Some(category));
        }
        assert_eq!(Category::from_key("closet"), None);
    }

    #[test]
    fn test_extension_groups() {
        let mapper = FileMapper::default();
        assert_eq!(mapper.extension_to_category("txt"), Some(Category::TextFiles));
        assert_eq!(mapper.extension_to_category("csv"), Some(Category::CsvFiles));
        assert_eq!(mapper.extension_to_category("bmp"), Some(Category::Images));
        assert_eq!(mapper.extension_to_category("rtf"), Some(Category::Documents));
        assert_eq!(mapper.extension_to_category("mov"), Some(Category::Media));
        assert_eq!(mapper.extension_to_category("java"), Some(Category::Code));
    }

    #[test]
    fn test_extension_to_category_case_insensitive() {
        let mapper = FileMapper::default();
        assert_eq!(mapper.extension_to_category("PDF"), Some(Category::Documents));
        assert_eq!(mapper.extension_to_category("Jpeg"), Some(Category::Images));
    }

    #[test]
    fn test_extension_match_is_exact() {
        let mapper = FileMapper::default();
        // Not in any list even though they look related.
        assert_eq!(mapper.extension_to_category("doc"), None);
        assert_eq!(mapper.extension_to_category("tiff"), None);
        assert_eq!(mapper.extension_to_category("rs"), None);
    }

    #[test]
    fn test_duplicate_overrides_size_and_type() {
        let mapper = FileMapper::default();
        for size in [SizeClass::Empty, SizeClass::Normal, SizeClass::Large, SizeClass::Huge] {
            assert_eq!(mapper.categorize(true, size, Some("txt")), Category::Duplicates);
        }
    }

    #[test]
    fn test_size_overrides_type() {
        let mapper = FileMapper::default();
        assert_eq!(
            mapper.categorize(false, SizeClass::Empty, Some("pdf")),
            Category::EmptyFiles
        );
        assert_eq!(
            mapper.categorize(false, SizeClass::Large, Some("mp4")),
            Category::LargeFiles
        );
        assert_eq!(
            mapper.categorize(false, SizeClass::Huge, Some("mp4")),
            Category::HugeFiles
        );
    }

    #[test]
    fn test_categorize_defaults_to_other() {
        let mapper = FileMapper::default();
        assert_eq!(mapper.categorize(false, SizeClass::Normal, None), Category::OtherFiles);
        assert_eq!(
            mapper.categorize(false, SizeClass::Normal, Some("xyz")),
            Category::OtherFiles
        );
    }

    #[test]
    fn test_custom_mapping() {
        let mut mapper = FileMapper::default();
        mapper.add_extension_mapping(".RS", Category::Code);
        assert_eq!(mapper.extension_to_category("rs"), Some(Category::Code));
    }
}
