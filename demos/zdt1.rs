use archipelago::*;

fn main() -> Result<()> {
  env_logger::init();

  // ZDT1 with 10 variables, its front is f1 = 1 - sqrt(f0)
  let n = 10;
  let config = Config::builder()
    .nova(2)
    .nsol(60)
    .ncpu(3)
    .tf(300)
    .migration(Migration::Tournament)
    .flt_min(vec![0.0; n])
    .flt_max(vec![1.0; n])
    .build();
  let problem = |f: &mut [f64],
                 _: &mut [f64],
                 _: &mut [f64],
                 x: &[f64],
                 _: &[i64],
                 _: usize| {
    let g = 1.0 + 9.0 * x[1..].iter().sum::<f64>() / (x.len() - 1) as f64;
    f[0] = x[0];
    f[1] = g * (1.0 - (x[0] / g).sqrt());
  };

  let grid = FrontGrid::builder().fmin([0.0, 0.0]).fmax([1.0, 1.0]).build();
  let mut optimizer = Optimizer::builder()
    .evolver(Evolver::with_operators(config, problem)?)
    .ntrials(5)
    .reference(FrontAssessor::new(|f0| 1.0 - f0.sqrt(), grid)?)
    .build();
  let report = optimizer.run()?;

  println!("{} evaluations per trial", report.nfeval());
  if let Some(s) = report.distance_error() {
    let (min, ave, max) = (s.min, s.ave, s.max);
    println!("dist_err min = {min:.4} ave = {ave:.4} max = {max:.4}");
  }
  if let Some(s) = report.spread() {
    let (min, ave, max) = (s.min, s.ave, s.max);
    println!("spread   min = {min:.4} ave = {ave:.4} max = {max:.4}");
  }
  Ok(())
}
