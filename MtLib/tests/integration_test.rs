use glam::{Mat4, Vec2, Vec3};
use mtlib::formats::material::{CmdData, MaterialCmd, TextureInfo};
use mtlib::formats::model::{Joint, Primitive, PrimitiveIndices};
use mtlib::formats::texture::{dds_bytes_to_tex_bytes, tex_bytes_to_dds_bytes};
use mtlib::converter::{
    convert_json_to_mod, convert_mod_to_json, read_intermediate_json, write_intermediate_json,
};
use mtlib::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn exporter_shaders() -> ShaderRegistry {
    let mut registry = ShaderRegistry::new();
    for (i, format) in VertexFormat::ALL.into_iter().enumerate() {
        registry.insert(0x10 + i as u32, format.shader_name(), 0xA0000 + i as u32);
    }
    registry
}

#[test]
fn test_mod_two_joint_scenario() {
    let mut bone_map = vec![-1; 256];
    bone_map[0] = 0;
    bone_map[1] = 1;
    let model = Model {
        joints: vec![
            Joint {
                id: 0,
                ..Joint::default()
            },
            Joint {
                id: 1,
                parent_index: 0,
                length: 1.0,
                offset: Vec3::Y,
                ..Joint::default()
            },
        ],
        joint_local_mtx: vec![Mat4::IDENTITY, Mat4::from_translation(Vec3::Y)],
        joint_inv_bind_mtx: vec![Mat4::IDENTITY, Mat4::from_translation(-Vec3::Y)],
        bone_map,
        materials: vec!["body".to_string()],
        primitives: vec![Primitive {
            vertex_count: 3,
            indices: PrimitiveIndices::new(0, 0, 0xFF),
            vertex_flags: 0x09,
            vertex_stride: 20,
            render_flags: 67,
            vertex_shader: ShaderObjectId::new(0x12, 0xA0002),
            index_count: 3,
            max_vertex_index: 3,
            ..Primitive::default()
        }],
        vertex_buffer: (0..60u8).collect(),
        index_buffer: vec![0, 1, 2],
        ..Model::default()
    };

    let bytes = serialize_mod(&model).unwrap();
    let parsed = parse_mod_bytes(&bytes).unwrap();

    assert_eq!(parsed.header.joint_count, 2);
    assert_eq!(parsed.header.group_count, 0);
    assert_eq!(parsed.header.material_count, 1);
    assert_eq!(parsed.primitives[0].indices.material_index(), 0);
    assert_eq!(parsed.primitives[0].vertex_stride, 20);
    assert_eq!(parsed.primitives[0].vertex_count, 3);
    assert_eq!(parsed.primitives[0].index_count, 3);
    assert_eq!(parsed.joint_inv_bind_mtx, model.joint_inv_bind_mtx);
    assert_eq!(serialize_mod(&parsed).unwrap(), bytes);
}

#[test]
fn test_dxt1_dds_tex_round_trip() {
    let mut dds = ddsfile::Dds::new_d3d(ddsfile::NewD3dParams {
        height: 256,
        width: 256,
        depth: None,
        format: ddsfile::D3DFormat::DXT1,
        mipmap_levels: None,
        caps2: None,
    })
    .unwrap();
    dds.data = (0..256 / 4 * 256 / 4 * 8).map(|i| (i * 7 % 251) as u8).collect();
    let mut dds_bytes = Vec::new();
    dds.write(&mut dds_bytes).unwrap();

    let tex = dds_bytes_to_tex_bytes(&dds_bytes, DdsToTexOptions::default()).unwrap();
    let texture = parse_tex_bytes(&tex).unwrap();
    assert_eq!((texture.width(), texture.height()), (256, 256));

    let dds_again = tex_bytes_to_dds_bytes(&tex).unwrap();
    let tex_again = dds_bytes_to_tex_bytes(&dds_again, DdsToTexOptions::default()).unwrap();
    assert_eq!(tex_again, tex);
}

#[test]
fn test_material_binary_round_trip() {
    let library = MaterialLibrary {
        textures: vec![TextureInfo {
            path: "chr\\pl00\\body_BM".into(),
            ..TextureInfo::default()
        }],
        materials: vec![Material {
            name_hash: 0x1234,
            cmds: vec![MaterialCmd::new(ShaderObjectId::new(2, 0x5), CmdData::Texture(1))],
            ..Material::default()
        }],
        ..MaterialLibrary::default()
    };

    let registry = ShaderRegistry::new();
    let bytes = serialize_mrl(&library, 64).unwrap();
    let parsed = parse_mrl_bytes(&bytes, &registry, 64).unwrap();
    assert_eq!(parsed.textures[0].path, "chr\\pl00\\body_BM");
    assert_eq!(serialize_mrl(&parsed, 64).unwrap(), bytes);
}

#[test]
fn test_intermediate_files_round_trip() {
    let dir = tempdir().unwrap();
    let json = dir.path().join("stage.json");
    let built = dir.path().join("stage.mod");
    let dumped = dir.path().join("stage_dump.json");

    let mut prim = ImPrimitive::new("floor@RM(3)", "stage_floor");
    for &(x, z) in &[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)] {
        let mut v = ImVertex::new(Vec3::new(x, 0.0, z), Vec3::Y);
        v.set_uv(UvChannel::Primary, Vec2::new(x / 4.0, z / 4.0));
        prim.vertices.push(v);
    }
    prim.indices = Some(vec![0, 2, 1, 0, 3, 2]);
    let im = IntermediateModel {
        primitives: vec![prim],
        ..IntermediateModel::default()
    };

    write_intermediate_json(&im, &json).unwrap();
    assert_eq!(read_intermediate_json(&json).unwrap(), im);

    let profile = TargetProfile::mvc3_pc();
    let shaders = exporter_shaders();
    convert_json_to_mod(&json, &built, &profile, &shaders).unwrap();

    let model = read_mod(&built).unwrap();
    assert_eq!(model.materials, vec!["stage_floor"]);
    assert_eq!(model.primitives[0].render_flags, 3);
    assert_eq!(model.header.polygon_count, 2);

    convert_mod_to_json(&built, &dumped, &profile, &shaders).unwrap();
    let back = read_intermediate_json(&dumped).unwrap();
    let prim = &back.primitives[0];
    assert_eq!(prim.vertex_format, Some(VertexFormat::IANonSkinTB));
    assert_eq!(prim.indices.as_deref(), Some(&[0, 1, 2, 0, 3, 1][..]));
    let positions: Vec<Vec3> = prim.vertices.iter().map(|v| v.position).collect();
    assert_eq!(
        positions,
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 4.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 4.0),
        ]
    );
}
