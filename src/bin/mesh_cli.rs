#[cfg(target_arch = "wasm32")]
fn main() {
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(err) = native::run() {
        eprintln!("mesh_cli error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use spline_engine::geom::{
        ExtrusionSegment, FillingMode, GeomMesh, GeomMeshDiagnostics, MeshBender, Point3,
        ProfileVertex, ScaleRollGradient, SmoothOptions, SourceMesh, Spline, SplineNode, Vec2,
        apply_scale_roll_gradient, box_mesh, mirrored_profile, smooth_spline,
    };
    use spline_engine::snapshot::{mesh_snapshot, normalize_snapshot_text};
    use std::fs::{self, File};
    use std::io::{BufWriter, Write};
    use std::path::{Path, PathBuf};

    const USAGE: &str = r#"mesh_cli (spline-engine)

USAGE:
  mesh_cli list
  mesh_cli run <scenario|all> [options]

SCENARIOS:
  extrude_triangle
  extrude_rail_loop
  bend_box
  repeat_box
  tentacle

OPTIONS (run):
  --out-dir <dir>    Write <scenario>.obj and/or <scenario>.snap to this dir (required for `all`)
  --obj <path>       Write OBJ (single scenario only)
  --snap <path>      Write golden-style snapshot (single scenario only)
  --no-obj           Skip OBJ when using --out-dir
  --no-snap          Skip snapshot when using --out-dir
  --overwrite        Overwrite existing output files
  -h, --help         Show this help
"#;

    pub fn run() -> Result<(), String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut args = Args::new(args);

        let Some(command) = args.next() else {
            print_usage();
            return Ok(());
        };

        match command.as_str() {
            "list" => {
                print_scenarios();
                Ok(())
            }
            "run" => cmd_run(&mut args),
            "-h" | "--help" | "help" => {
                print_usage();
                Ok(())
            }
            other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
        }
    }

    fn print_usage() {
        println!("{USAGE}");
    }

    fn print_scenarios() {
        for scenario in Scenario::ALL {
            println!("{}", scenario.name());
        }
    }

    fn cmd_run(args: &mut Args) -> Result<(), String> {
        let scenario_name = args.next().ok_or("missing scenario name")?;

        let mut out_dir: Option<PathBuf> = None;
        let mut obj_path: Option<PathBuf> = None;
        let mut snap_path: Option<PathBuf> = None;
        let mut overwrite = false;
        let mut write_obj = true;
        let mut write_snap = true;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--out-dir" => out_dir = Some(PathBuf::from(args.value("--out-dir")?)),
                "--obj" => obj_path = Some(PathBuf::from(args.value("--obj")?)),
                "--snap" => snap_path = Some(PathBuf::from(args.value("--snap")?)),
                "--overwrite" => overwrite = true,
                "--no-obj" => write_obj = false,
                "--no-snap" => write_snap = false,
                "-h" | "--help" => {
                    print_usage();
                    return Ok(());
                }
                other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
            }
        }

        if let Some(dir) = out_dir.as_ref() {
            if obj_path.is_some() || snap_path.is_some() {
                return Err("use either --out-dir or --obj/--snap (not both)".to_string());
            }
            if !write_obj && !write_snap {
                return Err("nothing to write (both --no-obj and --no-snap set)".to_string());
            }

            fs::create_dir_all(dir).map_err(|e| format!("create out dir: {e}"))?;

            if scenario_name == "all" {
                for scenario in Scenario::ALL {
                    run_one_scenario_to_dir(*scenario, dir, write_obj, write_snap, overwrite)?;
                }
                return Ok(());
            }

            let scenario = Scenario::from_str(scenario_name.as_str())
                .ok_or_else(|| unknown_scenario(&scenario_name))?;
            return run_one_scenario_to_dir(scenario, dir, write_obj, write_snap, overwrite);
        }

        if scenario_name == "all" {
            return Err("`run all` requires --out-dir".to_string());
        }

        let scenario =
            Scenario::from_str(scenario_name.as_str()).ok_or_else(|| unknown_scenario(&scenario_name))?;
        let output = run_scenario(scenario)?;

        if let Some(path) = snap_path.as_deref() {
            write_text_file(path, &output.snapshot, overwrite)?;
            eprintln!("wrote {}", path.display());
        } else {
            print!("{}", output.snapshot);
        }

        if let Some(path) = obj_path.as_deref() {
            write_obj_file(path, &output.mesh, output.name, overwrite)?;
            eprintln!("wrote {}", path.display());
        }

        report(&output);
        Ok(())
    }

    fn run_one_scenario_to_dir(
        scenario: Scenario,
        dir: &Path,
        write_obj: bool,
        write_snap: bool,
        overwrite: bool,
    ) -> Result<(), String> {
        let output = run_scenario(scenario)?;

        if write_snap {
            let path = dir.join(format!("{}.snap", output.name));
            write_text_file(&path, &output.snapshot, overwrite)?;
            eprintln!("wrote {}", path.display());
        }

        if write_obj {
            let path = dir.join(format!("{}.obj", output.name));
            write_obj_file(&path, &output.mesh, output.name, overwrite)?;
            eprintln!("wrote {}", path.display());
        }

        report(&output);
        Ok(())
    }

    fn report(output: &ScenarioOutput) {
        eprintln!(
            "{}: vertices={} triangles={} | {}",
            output.name,
            output.mesh.vertex_count(),
            output.mesh.triangle_count(),
            output.mesh_diag.summary()
        );
    }

    fn unknown_scenario(name: &str) -> String {
        let mut msg = format!("unknown scenario `{name}`\n\navailable scenarios:\n");
        for scenario in Scenario::ALL {
            msg.push_str("  ");
            msg.push_str(scenario.name());
            msg.push('\n');
        }
        msg
    }

    fn write_text_file(path: &Path, text: &str, overwrite: bool) -> Result<(), String> {
        if path.exists() && !overwrite {
            return Err(format!(
                "refusing to overwrite existing file {} (use --overwrite)",
                path.display()
            ));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
        }

        fs::write(path, normalize_snapshot_text(text)).map_err(|e| format!("write {}: {e}", path.display()))
    }

    fn write_obj_file(path: &Path, mesh: &GeomMesh, name: &str, overwrite: bool) -> Result<(), String> {
        mesh.validate().map_err(|e| format!("mesh validation failed: {e}"))?;

        if path.exists() && !overwrite {
            return Err(format!(
                "refusing to overwrite existing file {} (use --overwrite)",
                path.display()
            ));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
        }

        let file = File::create(path).map_err(|e| format!("create {}: {e}", path.display()))?;
        let mut w = BufWriter::new(file);

        writeln!(w, "# spline-engine mesh_cli").map_err(|e| format!("write obj: {e}"))?;
        writeln!(w, "o {name}").map_err(|e| format!("write obj: {e}"))?;

        for p in mesh.positions.iter().copied() {
            writeln!(w, "v {} {} {}", p[0], p[1], p[2]).map_err(|e| format!("write obj: {e}"))?;
        }

        if let Some(uvs) = mesh.uvs.as_ref() {
            for uv in uvs.iter().copied() {
                writeln!(w, "vt {} {}", uv[0], uv[1]).map_err(|e| format!("write obj: {e}"))?;
            }
        }

        if let Some(normals) = mesh.normals.as_ref() {
            for n in normals.iter().copied() {
                writeln!(w, "vn {} {} {}", n[0], n[1], n[2]).map_err(|e| format!("write obj: {e}"))?;
            }
        }

        let has_uvs = mesh.uvs.is_some();
        let has_normals = mesh.normals.is_some();

        for tri in mesh.indices.chunks_exact(3) {
            let a = tri[0] + 1;
            let b = tri[1] + 1;
            let c = tri[2] + 1;

            match (has_uvs, has_normals) {
                (true, true) => writeln!(w, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}"),
                (true, false) => writeln!(w, "f {a}/{a} {b}/{b} {c}/{c}"),
                (false, true) => writeln!(w, "f {a}//{a} {b}//{b} {c}//{c}"),
                (false, false) => writeln!(w, "f {a} {b} {c}"),
            }
            .map_err(|e| format!("write obj: {e}"))?;
        }

        w.flush().map_err(|e| format!("flush {}: {e}", path.display()))
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Scenario {
        ExtrudeTriangle,
        ExtrudeRailLoop,
        BendBox,
        RepeatBox,
        Tentacle,
    }

    impl Scenario {
        const ALL: &'static [Scenario] = &[
            Scenario::ExtrudeTriangle,
            Scenario::ExtrudeRailLoop,
            Scenario::BendBox,
            Scenario::RepeatBox,
            Scenario::Tentacle,
        ];

        fn name(self) -> &'static str {
            match self {
                Scenario::ExtrudeTriangle => "extrude_triangle",
                Scenario::ExtrudeRailLoop => "extrude_rail_loop",
                Scenario::BendBox => "bend_box",
                Scenario::RepeatBox => "repeat_box",
                Scenario::Tentacle => "tentacle",
            }
        }

        fn from_str(name: &str) -> Option<Self> {
            match name {
                "extrude_triangle" => Some(Scenario::ExtrudeTriangle),
                "extrude_rail_loop" => Some(Scenario::ExtrudeRailLoop),
                "bend_box" => Some(Scenario::BendBox),
                "repeat_box" => Some(Scenario::RepeatBox),
                "tentacle" => Some(Scenario::Tentacle),
                _ => None,
            }
        }
    }

    struct ScenarioOutput {
        name: &'static str,
        mesh: GeomMesh,
        mesh_diag: GeomMeshDiagnostics,
        snapshot: String,
    }

    impl ScenarioOutput {
        fn new(name: &'static str, mesh: GeomMesh, mesh_diag: GeomMeshDiagnostics) -> Result<Self, String> {
            let snapshot = mesh_snapshot(name, &mesh, &mesh_diag)?;
            Ok(Self {
                name,
                mesh,
                mesh_diag,
                snapshot,
            })
        }
    }

    fn run_scenario(scenario: Scenario) -> Result<ScenarioOutput, String> {
        match scenario {
            Scenario::ExtrudeTriangle => scenario_extrude_triangle(),
            Scenario::ExtrudeRailLoop => scenario_extrude_rail_loop(),
            Scenario::BendBox => scenario_bend_box(FillingMode::Once),
            Scenario::RepeatBox => scenario_bend_box(FillingMode::Repeat),
            Scenario::Tentacle => scenario_tentacle(),
        }
    }

    fn straight_spline(length: f64) -> Spline {
        Spline::new(
            SplineNode::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)),
            SplineNode::new(Point3::new(length, 0.0, 0.0), Point3::new(length + 1.0, 0.0, 0.0)),
        )
    }

    fn extrude(name: &'static str, spline: &Spline, shape: Vec<ProfileVertex>, spacing: f64) -> Result<ScenarioOutput, String> {
        let mut segment = ExtrusionSegment::new(shape);
        segment.set_sample_spacing(spacing).map_err(|e| e.to_string())?;
        segment.compute(spline).map_err(|e| e.to_string())?;
        ScenarioOutput::new(name, segment.mesh().clone(), segment.diagnostics().clone())
    }

    fn scenario_extrude_triangle() -> Result<ScenarioOutput, String> {
        let spline = straight_spline(10.0);
        extrude("extrude_triangle", &spline, ProfileVertex::default_shape(), 0.5)
    }

    /// Rail-like half profile mirrored into a closed section, swept around a
    /// smoothed square loop.
    fn scenario_extrude_rail_loop() -> Result<ScenarioOutput, String> {
        let half = [
            ProfileVertex::new(Vec2::new(0.3, 0.0), Vec2::new(1.0, 0.0), 0.0),
            ProfileVertex::new(Vec2::new(0.3, 0.2), Vec2::new(1.0, 0.0), 0.2),
            ProfileVertex::new(Vec2::new(0.1, 0.3), Vec2::new(0.0, 1.0), 0.4),
        ];
        let shape = mirrored_profile(&half);

        let corners = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 10.0),
            Point3::new(0.0, 0.0, 10.0),
        ];
        let nodes = corners
            .iter()
            .map(|p| SplineNode::new(*p, Point3::new(p.x + 1.0, p.y, p.z)))
            .collect();
        let mut spline = Spline::from_nodes(nodes).map_err(|e| e.to_string())?;
        spline.set_loop(true);
        smooth_spline(&mut spline, SmoothOptions::default()).map_err(|e| e.to_string())?;

        extrude("extrude_rail_loop", &spline, shape, 0.5)
    }

    fn scenario_bend_box(mode: FillingMode) -> Result<ScenarioOutput, String> {
        let name = match mode {
            FillingMode::Once => "bend_box",
            FillingMode::Repeat => "repeat_box",
        };
        let spline = Spline::new(
            SplineNode::new(Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 0.0, 0.0)),
            SplineNode::new(Point3::new(10.0, 0.0, 5.0), Point3::new(10.0, 0.0, 8.0)),
        );

        let mut bender = MeshBender::new(SourceMesh::build(&box_mesh([2.0, 1.0, 1.0])));
        bender.set_filling_mode(mode);
        bender.compute(&spline).map_err(|e| e.to_string())?;
        ScenarioOutput::new(name, bender.mesh().clone(), bender.diagnostics().clone())
    }

    /// Tapering, twisting tube along a three-node spline.
    fn scenario_tentacle() -> Result<ScenarioOutput, String> {
        let mut spline = straight_spline(5.0);
        spline.add_node(SplineNode::new(
            Point3::new(10.0, 3.0, 0.0),
            Point3::new(11.0, 4.0, 0.0),
        ));
        smooth_spline(&mut spline, SmoothOptions::default()).map_err(|e| e.to_string())?;
        apply_scale_roll_gradient(
            &mut spline,
            ScaleRollGradient {
                start_scale: 1.0,
                end_scale: 0.2,
                start_roll: 0.0,
                end_roll: 180.0,
            },
        )
        .map_err(|e| e.to_string())?;

        extrude("tentacle", &spline, ProfileVertex::default_shape(), 0.25)
    }

    struct Args {
        args: Vec<String>,
        pos: usize,
    }

    impl Args {
        fn new(args: Vec<String>) -> Self {
            Self { args, pos: 0 }
        }

        fn next(&mut self) -> Option<String> {
            let arg = self.args.get(self.pos)?.clone();
            self.pos += 1;
            Some(arg)
        }

        fn value(&mut self, flag: &str) -> Result<String, String> {
            self.next()
                .ok_or_else(|| format!("missing value for {flag}"))
        }
    }
}
