use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::info;

use crate::app::{EntityKind, Rgb};
use crate::AppPaths;

use super::database::{Buildable, FloatRange, KindCatalog, KindDef, WanderDef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    UnknownKind,
    DuplicateKind,
    MissingKind,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

/// Reads `assets/base/kinds.xml` when present; otherwise the compiled-in catalog is used.
pub fn load_kind_catalog(app_paths: &AppPaths) -> Result<KindCatalog, ContentCompileError> {
    let path = app_paths.kind_catalog_path();
    if !path.is_file() {
        info!(path = %path.display(), "kind_catalog_builtin");
        return Ok(KindCatalog::builtin());
    }
    let raw = fs::read_to_string(&path).map_err(|source| ContentCompileError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read XML file: {source}"),
        file_path: path.clone(),
        location: None,
    })?;
    let catalog = compile_kind_catalog(&raw, &path)?;
    info!(
        path = %path.display(),
        kinds = catalog.defs().len(),
        "kind_catalog_loaded"
    );
    Ok(catalog)
}

pub fn compile_kind_catalog(raw: &str, file_path: &Path) -> Result<KindCatalog, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Kinds" {
        return Err(error_at_node(
            ContentErrorCode::InvalidRoot,
            "root element must be <Kinds>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let mut defs = Vec::<KindDef>::with_capacity(EntityKind::ALL.len());
    let mut seen_kinds = HashSet::<EntityKind>::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "KindDef" {
            return Err(error_at_node(
                ContentErrorCode::UnknownDefType,
                format!(
                    "unsupported def type <{}>; only <KindDef> is allowed",
                    child.tag_name().name()
                ),
                file_path,
                &doc,
                child,
            ));
        }
        let def = parse_kind_def(file_path, &doc, child)?;
        if !seen_kinds.insert(def.kind) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateKind,
                format!("kind '{}' is defined more than once", def.kind.as_token()),
                file_path,
                &doc,
                child,
            ));
        }
        defs.push(def);
    }

    if let Some(missing) = EntityKind::ALL
        .into_iter()
        .find(|kind| !seen_kinds.contains(kind))
    {
        return Err(ContentCompileError {
            code: ContentErrorCode::MissingKind,
            message: format!("no <KindDef> for kind '{}'", missing.as_token()),
            file_path: file_path.to_path_buf(),
            location: None,
        });
    }

    Ok(KindCatalog::from_complete_defs(defs))
}

fn parse_kind_def(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<KindDef, ContentCompileError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut kind: Option<EntityKind> = None;
    let mut label: Option<String> = None;
    let mut interaction_radius: Option<f32> = None;
    let mut removable: Option<(bool, Node<'_, '_>)> = None;
    let mut buildable: Option<Buildable> = None;
    let mut height: Option<FloatRange> = None;
    let mut radius: Option<FloatRange> = None;
    let mut noise: Option<FloatRange> = None;
    let mut color: Option<Rgb> = None;
    let mut wander: Option<(WanderDef, Node<'_, '_>)> = None;

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{}> in <KindDef>", field_name),
                file_path,
                doc,
                field,
            ));
        }

        match field_name.as_str() {
            "kind" => {
                let value = required_text(file_path, doc, field, "kind")?;
                let parsed = EntityKind::from_token(&value).ok_or_else(|| {
                    error_at_node(
                        ContentErrorCode::UnknownKind,
                        format!("unknown kind '{}'", value),
                        file_path,
                        doc,
                        field,
                    )
                })?;
                kind = Some(parsed);
            }
            "label" => {
                label = Some(required_text(file_path, doc, field, "label")?);
            }
            "interactionRadius" => {
                let value = required_text(file_path, doc, field, "interactionRadius")?;
                interaction_radius = Some(parse_positive(
                    file_path,
                    doc,
                    field,
                    "interactionRadius",
                    &value,
                )?);
            }
            "removable" => {
                let value = required_text(file_path, doc, field, "removable")?;
                let parsed = match value.as_str() {
                    "true" => true,
                    "false" => false,
                    _ => {
                        return Err(error_at_node(
                            ContentErrorCode::InvalidValue,
                            format!("invalid removable '{}'; allowed values: true, false", value),
                            file_path,
                            doc,
                            field,
                        ))
                    }
                };
                removable = Some((parsed, field));
            }
            "buildable" => {
                let value = required_text(file_path, doc, field, "buildable")?;
                let parsed = Buildable::from_token(&value).ok_or_else(|| {
                    error_at_node(
                        ContentErrorCode::InvalidValue,
                        format!(
                            "invalid buildable '{}'; allowed values: outdoor, indoor, both, none",
                            value
                        ),
                        file_path,
                        doc,
                        field,
                    )
                })?;
                buildable = Some(parsed);
            }
            "height" => height = Some(parse_range(file_path, doc, field, "height")?),
            "radius" => radius = Some(parse_range(file_path, doc, field, "radius")?),
            "noise" => noise = Some(parse_range(file_path, doc, field, "noise")?),
            "color" => {
                let value = required_text(file_path, doc, field, "color")?;
                color = Some(parse_color(file_path, doc, field, &value)?);
            }
            "wander" => {
                let move_speed = required_attr(file_path, doc, field, "wander", "moveSpeed")?;
                let move_speed = parse_positive(file_path, doc, field, "moveSpeed", move_speed)?;
                let radius = required_attr(file_path, doc, field, "wander", "radius")?;
                let radius = parse_positive(file_path, doc, field, "radius", radius)?;
                wander = Some((WanderDef { move_speed, radius }, field));
            }
            _ => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{}> in <KindDef>", field_name),
                    file_path,
                    doc,
                    field,
                ))
            }
        }
    }

    let missing = |name: &str| {
        error_at_node(
            ContentErrorCode::MissingField,
            format!("missing required field <{}> in <KindDef>", name),
            file_path,
            doc,
            node,
        )
    };
    let kind = kind.ok_or_else(|| missing("kind"))?;
    let label = label.ok_or_else(|| missing("label"))?;
    let interaction_radius = interaction_radius.ok_or_else(|| missing("interactionRadius"))?;
    let (removable, removable_node) = removable.ok_or_else(|| missing("removable"))?;
    let buildable = buildable.ok_or_else(|| missing("buildable"))?;
    let height = height.ok_or_else(|| missing("height"))?;
    let radius = radius.ok_or_else(|| missing("radius"))?;
    let color = color.ok_or_else(|| missing("color"))?;

    let wander = match (kind.is_animal(), wander) {
        (true, Some((def, _))) => Some(def),
        (true, None) => return Err(missing("wander")),
        (false, None) => None,
        (false, Some((_, field))) => {
            return Err(error_at_node(
                ContentErrorCode::InvalidValue,
                format!("<wander> is only valid for animal kinds, not '{}'", kind.as_token()),
                file_path,
                doc,
                field,
            ))
        }
    };

    if removable && kind == EntityKind::Door {
        return Err(error_at_node(
            ContentErrorCode::InvalidValue,
            "door is part of the room shell and cannot be removable".to_string(),
            file_path,
            doc,
            removable_node,
        ));
    }

    Ok(KindDef {
        kind,
        label,
        interaction_radius,
        removable,
        buildable,
        height,
        radius,
        noise: noise.unwrap_or(FloatRange::fixed(0.0)),
        color,
        wander,
    })
}

fn parse_range(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<FloatRange, ContentCompileError> {
    let min = required_attr(file_path, doc, node, field_name, "min")?;
    let min = parse_non_negative(file_path, doc, node, field_name, min)?;
    let max = required_attr(file_path, doc, node, field_name, "max")?;
    let max = parse_non_negative(file_path, doc, node, field_name, max)?;
    if max < min {
        return Err(error_at_node(
            ContentErrorCode::InvalidValue,
            format!("<{}> max {} is below min {}", field_name, max, min),
            file_path,
            doc,
            node,
        ));
    }
    Ok(FloatRange { min, max })
}

fn parse_color(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    value: &str,
) -> Result<Rgb, ContentCompileError> {
    value
        .strip_prefix('#')
        .filter(|hex| hex.len() == 6)
        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        .map(Rgb::from_hex)
        .ok_or_else(|| {
            error_at_node(
                ContentErrorCode::InvalidValue,
                format!("color '{}' must look like #rrggbb", value),
                file_path,
                doc,
                node,
            )
        })
}

fn parse_positive(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
    value: &str,
) -> Result<f32, ContentCompileError> {
    let parsed = parse_number(file_path, doc, node, field_name, value)?;
    if parsed <= 0.0 {
        return Err(error_at_node(
            ContentErrorCode::InvalidValue,
            format!("{} must be finite and > 0", field_name),
            file_path,
            doc,
            node,
        ));
    }
    Ok(parsed)
}

fn parse_non_negative(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
    value: &str,
) -> Result<f32, ContentCompileError> {
    let parsed = parse_number(file_path, doc, node, field_name, value)?;
    if parsed < 0.0 {
        return Err(error_at_node(
            ContentErrorCode::InvalidValue,
            format!("{} must be finite and >= 0", field_name),
            file_path,
            doc,
            node,
        ));
    }
    Ok(parsed)
}

fn parse_number(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
    value: &str,
) -> Result<f32, ContentCompileError> {
    let parsed = value.trim().parse::<f32>().map_err(|_| {
        error_at_node(
            ContentErrorCode::InvalidValue,
            format!("{} '{}' is not a valid number", field_name, value),
            file_path,
            doc,
            node,
        )
    })?;
    if !parsed.is_finite() {
        return Err(error_at_node(
            ContentErrorCode::InvalidValue,
            format!("{} must be finite", field_name),
            file_path,
            doc,
            node,
        ));
    }
    Ok(parsed)
}

fn required_attr<'a>(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'a, '_>,
    field_name: &str,
    attr: &str,
) -> Result<&'a str, ContentCompileError> {
    node.attribute(attr).ok_or_else(|| {
        error_at_node(
            ContentErrorCode::MissingField,
            format!("field <{}> needs attribute '{}'", field_name, attr),
            file_path,
            doc,
            node,
        )
    })
}

fn required_text(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, ContentCompileError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            format!("field <{}> must not be empty", field_name),
            file_path,
            doc,
            node,
        ));
    }
    Ok(value)
}

fn error_at_node(
    code: ContentErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> ContentCompileError {
    let pos = doc.text_pos_at(node.range().start);
    ContentCompileError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::app_paths_for_root;

    const BUILTIN: &str = include_str!("builtin_kinds.xml");

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    fn compile(raw: &str) -> Result<KindCatalog, ContentCompileError> {
        compile_kind_catalog(raw, Path::new("kinds.xml"))
    }

    /// Builtin catalog with the `<KindDef>` for `kind` swapped for `replacement`.
    fn builtin_with(kind: &str, replacement: &str) -> String {
        let marker = format!("<kind>{kind}</kind>");
        let kind_at = BUILTIN.find(&marker).expect("kind present");
        let start = BUILTIN[..kind_at].rfind("<KindDef>").expect("def start");
        let end = kind_at + BUILTIN[kind_at..].find("</KindDef>").expect("def end") + "</KindDef>".len();
        format!("{}{}{}", &BUILTIN[..start], replacement, &BUILTIN[end..])
    }

    #[test]
    fn builtin_compiles() {
        let catalog = compile(BUILTIN).expect("compile");
        let tree = catalog.def(EntityKind::Tree);
        assert_eq!(tree.label, "Tree");
        assert_eq!(tree.buildable, Buildable::Outdoor);
        assert!(tree.height.min <= tree.height.max);
    }

    #[test]
    fn overrides_replace_tuning() {
        let raw = builtin_with(
            "cow",
            r#"<KindDef><kind>cow</kind><label>Heifer</label><interactionRadius>2.5</interactionRadius>
               <removable>true</removable><buildable>outdoor</buildable>
               <height min="1.0" max="1.0"/><radius min="1.0" max="1.0"/><color>#000000</color>
               <wander moveSpeed="3.0" radius="4.0"/></KindDef>"#,
        );
        let catalog = compile(&raw).expect("compile");
        let cow = catalog.def(EntityKind::Cow);
        assert_eq!(cow.label, "Heifer");
        assert_eq!(cow.interaction_radius, 2.5);
        assert_eq!(
            cow.wander,
            Some(WanderDef {
                move_speed: 3.0,
                radius: 4.0
            })
        );
        assert_eq!(cow.noise, FloatRange::fixed(0.0));
    }

    #[test]
    fn missing_label_reports_location() {
        let raw = builtin_with(
            "tree",
            r#"<KindDef><kind>tree</kind><interactionRadius>1.5</interactionRadius><removable>true</removable>
               <buildable>outdoor</buildable><height min="4" max="7"/><radius min="1" max="2"/>
               <color>#2e7d32</color></KindDef>"#,
        );
        let err = compile(&raw).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::MissingField);
        assert!(err.message.contains("label"));
        assert!(err.location.is_some());
    }

    #[test]
    fn unknown_field_errors() {
        let raw = builtin_with(
            "tv",
            r#"<KindDef><kind>tv</kind><label>TV</label><interactionRadius>0.7</interactionRadius>
               <removable>true</removable><buildable>indoor</buildable><height min="1" max="1"/>
               <radius min="0.5" max="0.5"/><color>#222222</color><channel>7</channel></KindDef>"#,
        );
        let err = compile(&raw).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownField);
    }

    #[test]
    fn wander_is_required_for_animals_and_rejected_elsewhere() {
        let no_wander = builtin_with(
            "pig",
            r#"<KindDef><kind>pig</kind><label>Pig</label><interactionRadius>1</interactionRadius>
               <removable>true</removable><buildable>outdoor</buildable><height min="1" max="1"/>
               <radius min="1" max="1"/><color>#f8bbd0</color></KindDef>"#,
        );
        assert_eq!(
            compile(&no_wander).expect_err("err").code,
            ContentErrorCode::MissingField
        );

        let rock_wanders = builtin_with(
            "rock",
            r#"<KindDef><kind>rock</kind><label>Rock</label><interactionRadius>1</interactionRadius>
               <removable>true</removable><buildable>outdoor</buildable><height min="1" max="1"/>
               <radius min="1" max="1"/><color>#8d8d8d</color><wander moveSpeed="1" radius="1"/></KindDef>"#,
        );
        assert_eq!(
            compile(&rock_wanders).expect_err("err").code,
            ContentErrorCode::InvalidValue
        );
    }

    #[test]
    fn removable_door_is_rejected() {
        let raw = builtin_with(
            "door",
            r#"<KindDef><kind>door</kind><label>Door</label><interactionRadius>1.0</interactionRadius>
               <removable>true</removable><buildable>none</buildable><height min="2.1" max="2.1"/>
               <radius min="0.5" max="0.5"/><color>#4e342e</color></KindDef>"#,
        );
        let err = compile(&raw).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
        assert!(err.message.contains("door"), "{}", err.message);
        assert!(err.location.is_some());
    }

    #[test]
    fn inverted_range_and_bad_color_error() {
        let inverted = builtin_with(
            "bed",
            r#"<KindDef><kind>bed</kind><label>Bed</label><interactionRadius>1.3</interactionRadius>
               <removable>true</removable><buildable>indoor</buildable><height min="2" max="1"/>
               <radius min="1" max="1"/><color>#ffffff</color></KindDef>"#,
        );
        assert_eq!(
            compile(&inverted).expect_err("err").code,
            ContentErrorCode::InvalidValue
        );

        let bad_color = builtin_with(
            "bed",
            r#"<KindDef><kind>bed</kind><label>Bed</label><interactionRadius>1.3</interactionRadius>
               <removable>true</removable><buildable>indoor</buildable><height min="1" max="1"/>
               <radius min="1" max="1"/><color>white</color></KindDef>"#,
        );
        assert_eq!(
            compile(&bad_color).expect_err("err").code,
            ContentErrorCode::InvalidValue
        );
    }

    #[test]
    fn duplicate_and_missing_kinds_error() {
        let couch_start = BUILTIN.find("<kind>couch</kind>").expect("couch");
        let def_start = BUILTIN[..couch_start].rfind("<KindDef>").expect("start");
        let def_end = couch_start + BUILTIN[couch_start..].find("</KindDef>").expect("end") + 10;
        let couch = &BUILTIN[def_start..def_end];

        let duplicated = BUILTIN.replacen("</Kinds>", &format!("{couch}</Kinds>"), 1);
        assert_eq!(
            compile(&duplicated).expect_err("err").code,
            ContentErrorCode::DuplicateKind
        );

        let removed = format!("{}{}", &BUILTIN[..def_start], &BUILTIN[def_end..]);
        let err = compile(&removed).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::MissingKind);
        assert!(err.message.contains("couch"));
    }

    #[test]
    fn unknown_kind_and_bad_root_error() {
        let dragon = builtin_with(
            "dog",
            r#"<KindDef><kind>dragon</kind></KindDef>"#,
        );
        assert_eq!(
            compile(&dragon).expect_err("err").code,
            ContentErrorCode::UnknownKind
        );
        assert_eq!(
            compile("<Defs/>").expect_err("err").code,
            ContentErrorCode::InvalidRoot
        );
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = compile("<Kinds><KindDef><kind>tree</kind></Kinds>").expect_err("err");
        assert_eq!(err.code, ContentErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }

    #[test]
    fn load_falls_back_to_builtin_without_file() {
        let temp = TempDir::new().expect("temp");
        let app = app_paths_for_root(temp.path().to_path_buf()).expect("paths");
        let catalog = load_kind_catalog(&app).expect("load");
        assert_eq!(catalog, KindCatalog::builtin());
    }

    #[test]
    fn load_reads_catalog_file_and_reports_its_path() {
        let temp = TempDir::new().expect("temp");
        let app = app_paths_for_root(temp.path().to_path_buf()).expect("paths");
        write_file(&app.kind_catalog_path(), "<Kinds>");
        let err = load_kind_catalog(&app).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::XmlMalformed);
        assert!(err
            .file_path
            .ends_with(Path::new("assets").join("base").join("kinds.xml")));
    }
}
