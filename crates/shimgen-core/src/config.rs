//! Generator configuration.
//!
//! Every library-specific table the engine consults lives here: the
//! primitive and value-struct tables, ignore lists, renames, and the
//! hand-written declarations that replace parsed ones. `Default` carries the
//! built-in tables; a `shimgen.toml` file can override any of them.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::declaration::RawDeclaration;
use crate::error::{CoreError, Result};

/// How a primitive native type appears on each side of the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimitiveType {
    /// Shim-side C spelling.
    pub c_type: String,
    /// Safe-side Rust type.
    pub rust_type: String,
    /// Rust type used in extern declarations when it differs from `rust_type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffi_type: Option<String>,
}

impl PrimitiveType {
    fn new(c_type: &str, rust_type: &str) -> Self {
        Self {
            c_type: c_type.to_string(),
            rust_type: rust_type.to_string(),
            ffi_type: None,
        }
    }

    pub fn ffi_type(&self) -> &str {
        self.ffi_type.as_deref().unwrap_or(&self.rust_type)
    }
}

/// A fixed-layout struct known ahead of any declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueStruct {
    /// Module that owns the definition.
    pub module: String,
    pub name: String,
    /// `(field name, native type)`; arrays are spelled `elem[N]`.
    pub fields: Vec<(String, String)>,
}

impl ValueStruct {
    fn new(module: &str, name: &str, fields: &[(&str, &str)]) -> Self {
        Self {
            module: module.to_string(),
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|(n, t)| (n.to_string(), t.to_string()))
                .collect(),
        }
    }
}

/// Complete generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Prefix of every generated C symbol and struct (`cv`).
    pub prefix: String,
    /// Native namespace the wrapped types live in.
    pub native_namespace: String,
    /// Native exception type caught at the shim boundary.
    pub native_exception: String,
    /// Module header include, `{module}` is substituted.
    pub module_header: String,
    /// Header declaring which native modules are available.
    pub modules_header: Option<String>,
    /// Module feature guard macro, `{MODULE}` is substituted.
    pub module_guard: String,
    /// Module holding shared types that every other module imports.
    pub base_module: String,
    pub primitives: BTreeMap<String, PrimitiveType>,
    pub value_structs: Vec<ValueStruct>,
    /// Classes never wrapped; matched against the last `::` segment.
    pub ignored_classes: Vec<String>,
    /// Constant denylist, regular expressions anchored at the start.
    pub ignored_constants: Vec<String>,
    /// Safe-side names keyed by shim symbol.
    pub renames: BTreeMap<String, String>,
    /// Per module, classes that always get an owning wrapper.
    pub forced_boxed: BTreeMap<String, Vec<String>>,
    /// Per module, hand-written declarations ingested after parsed ones.
    pub manual: BTreeMap<String, Vec<RawDeclaration>>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            prefix: "cv".to_string(),
            native_namespace: "cv".to_string(),
            native_exception: "cv::Exception".to_string(),
            module_header: "opencv2/{module}/{module}.hpp".to_string(),
            modules_header: Some("opencv2/opencv_modules.hpp".to_string()),
            module_guard: "HAVE_OPENCV_{MODULE}".to_string(),
            base_module: "core".to_string(),
            primitives: default_primitives(),
            value_structs: default_value_structs(),
            ignored_classes: ["FileNode", "FileStorage", "KDTree", "IndexParams", "Params"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignored_constants: [
                "CV_EXPORTS_W",
                "CV_EXPORTS_W_SIMPLE",
                "CV_EXPORTS_W_MAP",
                "CV_MAKE_TYPE",
                "CV_IS_CONT_MAT",
                "CV_RNG_COEFF",
                "IPL_IMAGE_MAGIC_VAL",
                "CV_SET_ELEM_FREE_FLAG",
                "CV_FOURCC_DEFAULT",
                "CV_WHOLE_ARR",
                "CV_WHOLE_SEQ",
                "CV_PI",
                "CV_LOG2",
                "CV_TYPE_NAME_IMAGE",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            renames: default_renames(),
            forced_boxed: BTreeMap::new(),
            manual: default_manual(),
        }
    }
}

impl GeneratorConfig {
    /// Parse a configuration from TOML. Missing keys keep their defaults.
    pub fn parse(input: &str) -> Result<Self> {
        let config: GeneratorConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check the configuration for values the emitter cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !is_identifier(&self.prefix) {
            return Err(CoreError::InvalidConfig {
                detail: format!("prefix '{}' is not a C identifier", self.prefix),
            });
        }
        if self.base_module.is_empty() {
            return Err(CoreError::InvalidConfig {
                detail: "base_module is required".to_string(),
            });
        }
        if !self.primitives.contains_key("void") {
            return Err(CoreError::InvalidConfig {
                detail: "primitive table must map 'void'".to_string(),
            });
        }
        for pattern in &self.ignored_constants {
            compile_anchored(pattern)?;
        }
        Ok(())
    }

    /// Qualify a scope path with the native namespace.
    pub fn native_path(&self, path: &str) -> String {
        if self.native_namespace.is_empty() || path.starts_with(&format!("{}::", self.native_namespace)) {
            path.to_string()
        } else {
            format!("{}::{}", self.native_namespace, path)
        }
    }

    pub fn value_struct(&self, name: &str) -> Option<&ValueStruct> {
        self.value_structs.iter().find(|v| v.name == name)
    }

    /// Whether a class or type name is on the ignore list.
    pub fn is_ignored_class(&self, type_name: &str) -> bool {
        let last = type_name.rsplit("::").next().unwrap_or(type_name);
        self.ignored_classes.iter().any(|c| c == last)
    }

    pub fn module_guard(&self, module: &str) -> String {
        self.module_guard
            .replace("{MODULE}", &module.to_uppercase())
            .replace("{module}", module)
    }

    pub fn module_header(&self, module: &str) -> String {
        self.module_header.replace("{module}", module)
    }

    pub fn manual_declarations(&self, module: &str) -> &[RawDeclaration] {
        self.manual.get(module).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn forced_boxed(&self, module: &str) -> &[String] {
        self.forced_boxed.get(module).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Compile a denylist pattern so it only matches at the start of a name.
pub(crate) fn compile_anchored(pattern: &str) -> Result<regex::Regex> {
    regex::Regex::new(&format!("^(?:{pattern})")).map_err(|source| CoreError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Whether `name` is a plain C/Rust identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn default_primitives() -> BTreeMap<String, PrimitiveType> {
    let mut table = BTreeMap::new();
    table.insert("void".to_string(), PrimitiveType::new("void", "()"));
    table.insert(
        "bool".to_string(),
        PrimitiveType {
            ffi_type: Some("i32".to_string()),
            ..PrimitiveType::new("int", "bool")
        },
    );
    table.insert("uchar".to_string(), PrimitiveType::new("unsigned char", "u8"));
    table.insert("short".to_string(), PrimitiveType::new("short", "i16"));
    table.insert("int".to_string(), PrimitiveType::new("int", "i32"));
    table.insert("size_t".to_string(), PrimitiveType::new("std::size_t", "usize"));
    table.insert("int64".to_string(), PrimitiveType::new("int64", "i64"));
    table.insert("float".to_string(), PrimitiveType::new("float", "f32"));
    table.insert("double".to_string(), PrimitiveType::new("double", "f64"));
    table
}

fn default_value_structs() -> Vec<ValueStruct> {
    let mut table = vec![
        ValueStruct::new("core", "Point", &[("x", "int"), ("y", "int")]),
        ValueStruct::new("core", "Point2d", &[("x", "double"), ("y", "double")]),
        ValueStruct::new("core", "Point2f", &[("x", "float"), ("y", "float")]),
        ValueStruct::new("core", "Size", &[("width", "int"), ("height", "int")]),
        ValueStruct::new("core", "Size2f", &[("width", "float"), ("height", "float")]),
        ValueStruct::new(
            "core",
            "Rect",
            &[("x", "int"), ("y", "int"), ("width", "int"), ("height", "int")],
        ),
        ValueStruct::new(
            "core",
            "RotatedRect",
            &[
                ("x", "float"),
                ("y", "float"),
                ("width", "float"),
                ("height", "float"),
                ("angle", "float"),
            ],
        ),
        ValueStruct::new(
            "core",
            "TermCriteria",
            &[("type", "int"), ("maxCount", "int"), ("epsilon", "double")],
        ),
        ValueStruct::new("core", "Scalar", &[("data", "double[4]")]),
    ];
    for len in [2, 3, 4, 6] {
        for (elem, tag) in [("uchar", "b"), ("short", "s"), ("int", "i"), ("double", "d"), ("float", "f")] {
            let array = format!("{elem}[{len}]");
            table.push(ValueStruct::new("core", &format!("Vec{len}{tag}"), &[("data", array.as_str())]));
        }
    }
    table
}

fn default_renames() -> BTreeMap<String, String> {
    [
        ("cv_core_divide_MMMDI", "divide_mat"),
        ("cv_core_norm_MMIM", "norm_dist"),
        ("cv_core_ellipse_MPSDDDSIII", "ellipse_tilted"),
        ("cv_core_Mat_Mat_III", "for_rows_and_cols"),
        ("cv_calib3d_StereoSGBM_StereoSGBM_IIIIIIIIIIB", "for_params"),
        ("cv_calib3d_StereoBM_StereoBM_III", "for_params"),
        ("cv_features2d_BOWKMeansTrainer_cluster_M", "cluster_with_desc"),
        ("cv_features2d_BOWTrainer_cluster_M", "cluster_with_desc"),
        ("cv_features2d_DescriptorMatcher_match_MVV", "matches"),
        ("cv_features2d_KeyPoint_KeyPoint_FFFFFII", "for_params"),
        ("cv_features2d_DMatch_DMatch_IIF", "for_params"),
        ("cv_features2d_DMatch_DMatch_IIIF", "for_image"),
        ("cv_features2d_DescriptorMatcher_knnMatch_MMVIMB", "knnTrainMatch"),
        ("cv_features2d_DescriptorMatcher_match_MMVM", "trainAndMatch"),
        ("cv_features2d_BRISK_BRISK_VVFFV", "for_pattern"),
        ("cv_highgui_VideoWriter_VideoWriter_SIDSB", "for_params"),
        ("cv_highgui_VideoCapture_VideoCapture_S", "for_file"),
        ("cv_highgui_VideoCapture_VideoCapture_I", "for_device"),
        ("cv_highgui_VideoCapture_open_S", "open_file"),
        ("cv_highgui_VideoCapture_open_I", "open_fd"),
        ("cv_imgproc_integral_MMMI", "integral_squares"),
        ("cv_imgproc_integral_MMMMI", "integral_squares_tilted"),
        ("cv_imgproc_distanceTransform_MMMIII", "distance_tranform_labels"),
        ("cv_imgproc_Subdiv2D_Subdiv2D_R", "for_rect"),
        ("cv_imgproc_Subdiv2D_insert_V", "insert_multi"),
        ("cv_objdetect_HOGDescriptor_HOGDescriptor_S", "for_file"),
        ("cv_objdetect_HOGDescriptor_HOGDescriptor_SSSSIIDIDBI", "for_params"),
        ("cv_objdetect_CascadeClassifier_detectMultiScale_MVVVDIISSB", "detectMultiScaleFull"),
        ("cv_objdetect_CascadeClassifier_CascadeClassifier_S", "for_file"),
        ("cv_video_calcOpticalFlowSF_MMMIIIDDIDDDIDDD", "calc_optical_flow_full"),
        ("cv_video_KalmanFilter_KalmanFilter_IIII", "for_params"),
        ("cv_video_BackgroundSubtractorMOG_BackgroundSubtractorMOG_IIDD", "for_params"),
        ("cv_video_BackgroundSubtractorMOG2_BackgroundSubtractorMOG2_IFB", "for_params"),
    ]
    .iter()
    .map(|(symbol, name)| (symbol.to_string(), name.to_string()))
    .collect()
}

fn default_manual() -> BTreeMap<String, Vec<RawDeclaration>> {
    use crate::declaration::RawArgument;

    let decl = |name: &str, spec: &str, mods: &[&str], args: Vec<RawArgument>| {
        RawDeclaration(
            name.to_string(),
            spec.to_string(),
            mods.iter().map(|m| m.to_string()).collect(),
            args,
        )
    };
    let core = vec![
        decl("class cv.Mat", "", &[], vec![]),
        decl("cv.Mat.Mat", "Mat", &[], vec![]),
        decl(
            "cv.Mat.Mat",
            "Mat",
            &[],
            vec![
                RawArgument::new("int", "rows"),
                RawArgument::new("int", "cols"),
                RawArgument::new("int", "type"),
            ],
        ),
        decl("cv.Mat.depth", "int", &["/C"], vec![]),
        decl("cv.Mat.channels", "int", &["/C"], vec![]),
        decl("cv.Mat.size", "Size", &["/C"], vec![]),
    ];
    BTreeMap::from([("core".to_string(), core)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_is_valid() {
        let config = GeneratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.prefix, "cv");
        assert!(config.value_struct("Vec3b").is_some());
        assert_eq!(
            config.value_struct("Vec6d").unwrap().fields,
            vec![("data".to_string(), "double[6]".to_string())]
        );
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = GeneratorConfig::parse(
            r#"
prefix = "ml"
ignored_classes = ["Secret"]

[renames]
ml_core_foo_I = "foo_int"
"#,
        )
        .unwrap();
        assert_eq!(config.prefix, "ml");
        assert!(config.is_ignored_class("ns::Secret"));
        assert!(!config.is_ignored_class("FileNode"));
        assert_eq!(config.renames.get("ml_core_foo_I").map(String::as_str), Some("foo_int"));
        assert_eq!(config.base_module, "core");
        assert!(config.primitives.contains_key("int"));
    }

    #[test]
    fn manual_declarations_from_toml() {
        let config = GeneratorConfig::parse(
            r#"
[manual]
imgproc = [
    ["class cv.Subdiv2D", "", [], []],
    ["cv.Subdiv2D.Subdiv2D", "", [], [["Rect", "rect", ""]]],
]
"#,
        )
        .unwrap();
        let decls = config.manual_declarations("imgproc");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[1].items()[0].type_name, "Rect");
        assert!(config.manual_declarations("video").is_empty());
    }

    #[test]
    fn rejects_bad_prefix() {
        let err = GeneratorConfig::parse(r#"prefix = "1bad""#).unwrap_err();
        assert!(err.to_string().contains("prefix"));
    }

    #[test]
    fn rejects_bad_pattern() {
        let err = GeneratorConfig::parse(r#"ignored_constants = ["CV_("]"#).unwrap_err();
        assert!(matches!(err, CoreError::Pattern { .. }));
    }

    #[test]
    fn module_substitutions() {
        let config = GeneratorConfig::default();
        assert_eq!(config.module_guard("imgproc"), "HAVE_OPENCV_IMGPROC");
        assert_eq!(config.module_header("imgproc"), "opencv2/imgproc/imgproc.hpp");
    }

    #[test]
    fn toml_round_trip() {
        let config = GeneratorConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = GeneratorConfig::parse(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("cv"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a::b"));
        assert!(!is_identifier("operator+"));
    }
}
