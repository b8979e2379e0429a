use crate::fixtures::{
    bmf_bytes, cfp_literal_bytes, character, cmx_text, far_bytes, motion, skill, skn_text,
    two_bone_mesh, two_bone_skeleton,
};
use crate::{
    AssetKind, Channel, Error, FarArchive, FarSource, ImportOptions, Importer, Resolver, Suit,
    SuitSkin,
};
use glam::Vec3;
use std::io::Cursor;

fn character_text() -> String {
    let suit = Suit {
        name: "casual".to_string(),
        kind: 0,
        skins: vec![SuitSkin {
            bone_name: "SPINE".to_string(),
            mesh_name: "body".to_string(),
            censor_flags: 0,
            reserved: 0,
        }],
    };
    let skills = vec![
        skill(
            "a2o-wave",
            "a2o-wave-anim",
            2,
            2,
            vec![motion("ROOT", 2, Some(0), Some(0))],
        ),
        skill("a2o-broken", "a2o-missing-anim", 1, 1, Vec::new()),
    ];
    cmx_text(&character(vec![two_bone_skeleton()], vec![suit], skills))
}

fn wave_frames() -> Vec<u8> {
    cfp_literal_bytes(&[
        &[0.0, 1.0],
        &[0.0, 0.0],
        &[0.0, 2.0],
        &[1.0, 0.5],
        &[0.0, 0.5],
        &[0.0, 0.5],
        &[0.0, 0.5],
    ])
}

fn resolver() -> Resolver {
    let cmx = character_text();
    let bmf = bmf_bytes(&two_bone_mesh());
    let cfp = wave_frames();
    let bytes = far_bytes(&[
        ("adult.cmx", cmx.as_bytes()),
        ("body.bmf", bmf.as_slice()),
        ("BodyTex.bmp", b"BM"),
        ("a2o-wave-anim.cfp", cfp.as_slice()),
    ]);
    let archive = FarArchive::new(Cursor::new(bytes)).expect("valid archive");
    Resolver::new().with_source(FarSource::new("avatars", archive))
}

#[test]
fn imports_skeleton_with_meshes() {
    let mut resolver = resolver();
    let mut importer = Importer::new(&mut resolver, ImportOptions::default());
    let import = importer.import_character("adult", &["body"]).unwrap();

    assert_eq!(import.name, "adult");
    assert_eq!(import.skeleton.bones.len(), 2);
    assert_eq!(import.pose.bones.len(), 2);
    assert_eq!(import.meshes.len(), 1);

    let mesh = &import.meshes[0];
    assert_eq!(mesh.name, "body");
    assert_eq!(mesh.positions.len(), 4);
    assert_eq!(mesh.positions[3], Vec3::new(1.0, 0.0, 1.5));
    assert_eq!(mesh.total_weight(1), 1.5);

    let texture = &import.textures["bodytex"];
    assert!(texture.is_temporary());
    assert_eq!(std::fs::read(texture.path()).unwrap(), b"BM");
    import.cleanup().unwrap();
    assert!(!texture.path().exists());
}

#[test]
fn textures_can_be_skipped() {
    let mut resolver = resolver();
    let options = ImportOptions {
        load_textures: false,
        ..ImportOptions::default()
    };
    let mut importer = Importer::new(&mut resolver, options);
    let import = importer.import_character("adult", &["body"]).unwrap();
    assert!(import.textures.is_empty());
    assert_eq!(import.meshes[0].texture.as_deref(), Some("bodytex"));
}

#[test]
fn imports_suit_meshes() {
    let mut resolver = resolver();
    let mut importer = Importer::new(&mut resolver, ImportOptions::default());
    let import = importer.import_suit("adult", "casual").unwrap();
    assert_eq!(import.name, "casual");
    assert_eq!(import.meshes[0].name, "body");
    import.cleanup().unwrap();

    let err = importer.import_suit("adult", "formal").unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: "suit", .. }), "{err:?}");
}

#[test]
fn skeleton_without_meshes() {
    let mut resolver = resolver();
    let mut importer = Importer::new(&mut resolver, ImportOptions::default());
    let import = importer.import_character::<&str>("adult", &[]).unwrap();
    assert!(import.meshes.is_empty());
    assert_eq!(import.pose.bone("SPINE").unwrap().head, Vec3::new(0.0, 0.0, 1.0));
}

#[test]
fn missing_mesh_is_not_found() {
    let mut resolver = resolver();
    let mut importer = Importer::new(&mut resolver, ImportOptions::default());
    let err = importer
        .import_character("adult", &["body", "hat"])
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: "mesh", .. }), "{err:?}");
}

#[test]
fn mesh_from_text_encoding() {
    let skn = skn_text(&two_bone_mesh());
    let bytes = far_bytes(&[("body.skn", skn.as_bytes())]);
    let archive = FarArchive::new(Cursor::new(bytes)).unwrap();
    let mut resolver = Resolver::new().with_source(FarSource::new("loose", archive));
    let mut importer = Importer::new(&mut resolver, ImportOptions::default());
    assert_eq!(importer.load_mesh("body").unwrap(), two_bone_mesh());
}

#[test]
fn imports_skill_curves() {
    let mut resolver = resolver();
    let options = ImportOptions {
        frame_length: 4.0,
        ..ImportOptions::default()
    };
    let mut importer = Importer::new(&mut resolver, options);
    let action = importer.import_skill("adult", "a2o-wave").unwrap();

    assert_eq!(action.name, "a2o-wave");
    assert_eq!(action.curves.len(), 7);
    let z = action.curve("ROOT", Channel::Location, 2).unwrap();
    assert_eq!(z.values().collect::<Vec<_>>(), vec![0.0, 2.0]);
    assert_eq!(z.keyframes[1].time, 4.0);

    let w = action.curve("ROOT", Channel::RotationQuaternion, 0).unwrap();
    assert_eq!(w.values().collect::<Vec<_>>(), vec![-1.0, -0.5]);
    let x = action.curve("ROOT", Channel::RotationQuaternion, 1).unwrap();
    assert_eq!(x.values().collect::<Vec<_>>(), vec![0.0, 0.5]);
}

#[test]
fn missing_skill_and_animation() {
    let mut resolver = resolver();
    let mut importer = Importer::new(&mut resolver, ImportOptions::default());

    let err = importer.import_skill("adult", "a2o-dance").unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: "skill", .. }), "{err:?}");

    let err = importer.import_skill("adult", "a2o-broken").unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: "animation", .. }), "{err:?}");

    let err = importer.load_character("child").unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: "character", .. }), "{err:?}");
}

#[test]
fn asset_kinds_have_labels() {
    assert_eq!(AssetKind::Texture.label(), "texture");
    assert_eq!(ImportOptions::default().frame_length, 1.0);
    assert!(ImportOptions::default().load_textures);
}
