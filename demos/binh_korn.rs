use std::{io::Write, path::Path};

use archipelago::*;

fn main() -> Result<()> {
  env_logger::init();

  // two floats, x in [0, 5] and y in [0, 3], and two inequality constraints
  let config = Config::builder()
    .nova(2)
    .ng(2)
    .nsol(96)
    .ncpu(4)
    .tf(200)
    .flt_min(vec![0.0, 0.0])
    .flt_max(vec![5.0, 3.0])
    .build();

  // f1(x, y) = 4x^2 + 4y^2 and f2(x, y) = (x - 5)^2 + (y - 5)^2
  let problem = |f: &mut [f64],
                 g: &mut [f64],
                 _: &mut [f64],
                 x: &[f64],
                 _: &[i64],
                 _: usize| {
    let (a, b) = (x[0], x[1]);
    f[0] = 4.0 * a * a + 4.0 * b * b;
    f[1] = (a - 5.0).powi(2) + (b - 5.0).powi(2);
    // (x - 5)^2 + y^2 <= 25
    g[0] = 25.0 - (a - 5.0).powi(2) - b * b;
    // (x - 8)^2 + (y + 3)^2 >= 7.7
    g[1] = (a - 8.0).powi(2) + (b + 3.0).powi(2) - 7.7;
  };

  let mut evolver = Evolver::with_operators(config, problem)?;
  let summary = evolver.run()?;
  let front = evolver.pareto_front();

  // write the front to demos/binh_korn.csv
  let _ =
    std::fs::File::create(Path::new(file!()).with_file_name("binh_korn.csv"))
      .unwrap()
      .write_all(
        front
          .iter()
          .map(|s| format!("{} {}", s.ova[0], s.ova[1]))
          .collect::<Vec<_>>()
          .join("\n")
          .as_bytes(),
      );

  println!(
    "{} front solutions after {} evaluations in {:?}",
    front.len(),
    summary.nfeval,
    summary.elapsed
  );
  println!("   x   |   y   ");
  for s in front.iter().take(10) {
    println!("{:.4} | {:.4}", s.flt[0], s.flt[1]);
  }
  println!("  ...  |  ...  ");
  Ok(())
}
