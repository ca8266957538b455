//! Template Resolution Tests
//!
//! Tests for:
//! - Slot substitution and determinism
//! - Missing and mistyped slots
//! - Cache keys ignoring unreferenced key entries
//! - Built-in skeletons and on-disk overrides
//! - Material binding into the built-in skeletons

use std::collections::BTreeSet;

use myth_variants::errors::TemplateError;
use myth_variants::material::{ColorSource, MaterialBinder, MaterialConfig, PositionSource};
use myth_variants::pipeline::*;

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(ToString::to_string).collect()
}

fn all_materials() -> Vec<MaterialConfig> {
    let mut configs = Vec::new();
    for color in [ColorSource::VertexAttribute, ColorSource::Constant] {
        for position in [PositionSource::Static, PositionSource::Skinned] {
            configs.push(MaterialConfig::new(color, position));
        }
    }
    configs
}

// ============================================================================
// Substitution
// ============================================================================

#[test]
fn resolve_substitutes_slot() {
    let template = ShaderTemplate::parse("t", "gl_Position = {{out_position}};").unwrap();
    let key = VariantKey::from([("out_position", "clip_position")]);

    let out = resolve(&template, &key).unwrap();
    assert_eq!(out.as_str(), "gl_Position = clip_position;");
    assert_eq!(out.template(), "t");
    assert_eq!(out.template_id(), template.id());
}

#[test]
fn resolve_is_deterministic() {
    let template = ShaderTemplate::parse("t", "let a = {{ a }};\nlet b = {{ b }};\n").unwrap();
    let k1 = VariantKey::from([("a", "1.0"), ("b", "2.0")]);
    let k2 = VariantKey::from([("b", "2.0"), ("a", "1.0")]);

    let r1 = resolve(&template, &k1).unwrap();
    let r2 = resolve(&template, &k2).unwrap();
    assert_eq!(r1, r2);
    assert_eq!(r1.as_str(), "let a = 1.0;\nlet b = 2.0;\n");
}

#[test]
fn resolve_evaluates_blocks() {
    let source = "{$ if flag $}a = {{ v }};{$ endif $}";
    let template = ShaderTemplate::parse("block", source).unwrap();
    assert_eq!(template.slots().map(|(n, _)| n).collect::<Vec<_>>(), ["flag", "v"]);

    let on = resolve(&template, &VariantKey::from([("flag", "yes"), ("v", "1")])).unwrap();
    assert_eq!(on.as_str(), "a = 1;");
    let off = resolve(&template, &VariantKey::from([("flag", ""), ("v", "1")])).unwrap();
    assert_eq!(off.as_str(), "");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn resolve_missing_slot_fails() {
    let template = ShaderTemplate::parse("t", "out_color = {{out_color}};").unwrap();
    let err = resolve(&template, &VariantKey::new()).unwrap_err();

    assert_eq!(
        err,
        TemplateError::MissingSlots {
            template: "t".into(),
            names: names(&["out_color"]),
        }
    );
}

#[test]
fn resolve_reports_every_missing_slot() {
    let template = ShaderTemplate::parse("t", "{{ a }} {{ b }} {{ c }} {{ d }}").unwrap();
    let key = VariantKey::from([("b", "1"), ("unrelated", "2")]);

    match resolve(&template, &key).unwrap_err() {
        TemplateError::MissingSlots { names: missing, .. } => {
            assert_eq!(missing, names(&["a", "c", "d"]));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn resolve_rejects_mistyped_slot() {
    let template = ShaderTemplate::parse("t", "{{ p }}")
        .unwrap()
        .with_slot_types(&[("p", SlotType::Vec3)])
        .unwrap();
    let key = VariantKey::new().with("p", "vec4<f32>(1.0)", SlotType::Vec4);

    let err = resolve(&template, &key).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::SlotTypeMismatch {
            expected: SlotType::Vec3,
            found: SlotType::Vec4,
            ..
        }
    ));
    assert!(err.to_string().contains("expects vec3<f32>"), "{err}");
}

#[test]
fn literal_placeholders_are_rejected() {
    // Literals render without ever reading the variant key.
    for literal in ["true", "none", "self", "None"] {
        let source = format!("let flag = 1;\nout_color = {{{{{literal}}}}};\n");
        match ShaderTemplate::parse("t", &source) {
            Err(TemplateError::Syntax { line, message, .. }) => {
                assert_eq!(line, Some(2), "{literal}");
                assert!(message.contains(literal), "{message}");
            }
            other => panic!("{literal}: expected syntax error, got {other:?}"),
        }
    }
}

#[test]
fn missing_slot_message_lists_names() {
    let template = ShaderTemplate::parse("mesh_test", "{{ x }}{{ y }}").unwrap();
    let err = resolve(&template, &VariantKey::new()).unwrap_err();
    assert_eq!(err.to_string(), "template `mesh_test` has unresolved slots: x, y");
}

// ============================================================================
// Cache Keys
// ============================================================================

#[test]
fn cache_key_ignores_unreferenced_entries() {
    let template = ShaderTemplate::parse("t", "{{ a }}").unwrap();
    let plain = resolve(&template, &VariantKey::from([("a", "1")])).unwrap();
    let noisy = resolve(&template, &VariantKey::from([("a", "1"), ("z", "2")])).unwrap();

    assert_eq!(plain.cache_key(), noisy.cache_key());
}

#[test]
fn cache_key_depends_on_expression_and_template() {
    let t1 = ShaderTemplate::parse("t", "{{ a }}").unwrap();
    let t2 = ShaderTemplate::parse("t", "{{ a }}\n").unwrap();

    let k1 = resolve(&t1, &VariantKey::from([("a", "1")])).unwrap().cache_key();
    let k2 = resolve(&t1, &VariantKey::from([("a", "2")])).unwrap().cache_key();
    let k3 = resolve(&t2, &VariantKey::from([("a", "1")])).unwrap().cache_key();

    assert_ne!(k1, k2);
    assert_ne!(k1, k3);
}

// ============================================================================
// Built-in Templates
// ============================================================================

#[test]
fn builtin_templates_declare_slots() {
    let library = TemplateLibrary::builtin(None).unwrap();
    let mut loaded: Vec<_> = library.names().collect();
    loaded.sort_unstable();
    assert_eq!(loaded, [MESH_TEMPLATE, SHADOW_TEMPLATE]);

    let mesh = library.get(MESH_TEMPLATE).unwrap();
    assert_eq!(mesh.slot_type(slots::OUT_COLOR), Some(SlotType::Vec4));
    assert_eq!(mesh.slot_type(slots::OUT_POSITION), Some(SlotType::Vec3));
    assert_eq!(mesh.slot_type(slots::SKIN_FUNCTIONS), Some(SlotType::Declarations));

    let shadow = library.get(SHADOW_TEMPLATE).unwrap();
    assert_eq!(shadow.slot_type(slots::OUT_COLOR), None);

    assert!(matches!(library.get("nope"), Err(TemplateError::NotFound(_))));
}

#[test]
fn builtin_templates_resolve_every_material() {
    let library = TemplateLibrary::builtin(None).unwrap();
    for name in [MESH_TEMPLATE, SHADOW_TEMPLATE] {
        let template = library.get(name).unwrap();
        for config in all_materials() {
            let source = template.resolve(&MaterialBinder::bind(&config)).unwrap();
            assert!(!source.as_str().contains("{{"), "{name} {config:?}");
            assert!(source.as_str().contains("fn vs_main"));
        }
    }
}

#[test]
fn shadow_variants_ignore_color_axis() {
    let library = TemplateLibrary::builtin(None).unwrap();
    let shadow = library.get(SHADOW_TEMPLATE).unwrap();
    let mesh = library.get(MESH_TEMPLATE).unwrap();

    let vertex = MaterialBinder::bind(&MaterialConfig::new(
        ColorSource::VertexAttribute,
        PositionSource::Static,
    ));
    let constant =
        MaterialBinder::bind(&MaterialConfig::new(ColorSource::Constant, PositionSource::Static));

    assert_eq!(
        shadow.resolve(&vertex).unwrap().cache_key(),
        shadow.resolve(&constant).unwrap().cache_key()
    );
    assert_ne!(
        mesh.resolve(&vertex).unwrap().cache_key(),
        mesh.resolve(&constant).unwrap().cache_key()
    );
}

#[test]
fn template_dir_overrides_builtin() {
    let dir = std::env::temp_dir().join(format!("myth_variants_override_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("mesh.wgsl"),
        concat!(
            "// override\n",
            "{{ skin_attributes }}{{ skin_functions }}",
            "{{ out_position }}{{ out_normal }}{{ out_color }}\n",
        ),
    )
    .unwrap();

    let library = TemplateLibrary::builtin(Some(&dir)).unwrap();
    let mesh = library.get(MESH_TEMPLATE).unwrap();
    let source = mesh.resolve(&MaterialBinder::bind(&MaterialConfig::default())).unwrap();
    assert!(source.as_str().starts_with("// override\n"));
    assert!(source.as_str().contains("input.positioninput.normalinput.color"));

    // Templates without a file on disk still come from the embedded set.
    let shadow = library.get(SHADOW_TEMPLATE).unwrap();
    assert!(shadow.slot_type(slots::OUT_POSITION).is_some());

    std::fs::remove_dir_all(&dir).unwrap();
}
