use dqm_core::{AccumulatorHandle, EventContext, JetCandidate};
use dqm_hist::Booker;
use dqm_monitor::region::{is_barrel, is_endcap, is_endcap_plus, is_forward};
use dqm_monitor::{
    BinningPSet, Event, JetMonitor, JetMonitorConfig, Region, RegionBinningConfig, RegionCatalogue,
};

fn event_with_jet(eta: f64, phi: f64) -> Event {
    let mut ev = Event {
        context: EventContext { run: 1, lumi: 7, event: 1, trigger_results: None },
        ..Default::default()
    };
    ev.jets.insert("ak4PFJetsCHS".into(), vec![JetCandidate { pt: 55.0, eta, phi }]);
    ev
}

#[test]
fn eta_boundaries() {
    assert!(is_barrel(1.3));
    assert!(!is_endcap(1.3));
    assert!(is_endcap(3.0));
    assert!(!is_forward(3.0));
    assert!(is_forward(3.0001));
    assert!(is_barrel(-1.3));
}

#[test]
fn phi_boundary_belongs_to_hep17_only() {
    let cat = RegionCatalogue::from_config(&RegionBinningConfig::default()).unwrap();
    assert_eq!(cat.matching(2.0, -0.52).collect::<Vec<_>>(), vec![Region::EndCapPlus, Region::Hep17]);
    assert_eq!(cat.matching(2.0, -0.87).collect::<Vec<_>>(), vec![Region::EndCapPlus]);
    assert_eq!(cat.matching(2.0, -0.17).collect::<Vec<_>>(), vec![Region::EndCapPlus, Region::Hep18]);
}

#[test]
fn catalogue_matching_is_exhaustive() {
    let cat = RegionCatalogue::from_config(&RegionBinningConfig::default()).unwrap();
    let hit: Vec<_> = cat.matching(2.0, -0.6).collect();
    assert_eq!(hit, vec![Region::EndCapPlus, Region::Hep17]);
    assert!(is_endcap_plus(2.0));

    let combined = RegionBinningConfig { combined_endcap: true, ..Default::default() };
    let cat = RegionCatalogue::from_config(&combined).unwrap();
    let mut hit: Vec<_> = cat.matching(-2.0, -0.6).collect();
    hit.sort();
    assert_eq!(hit, vec![Region::EndCap, Region::EndCapMinus, Region::Hem17]);
}

#[test]
fn fan_out_touches_global_he_plus_and_hep17_only() {
    let mut monitor: JetMonitor = JetMonitor::new(JetMonitorConfig::default()).unwrap();
    let mut booker = Booker::new();
    monitor.on_run_start(1, &mut booker).unwrap();

    let outcome = monitor.analyze(&event_with_jet(2.0, -0.6)).unwrap();
    assert_eq!(outcome.regions, vec![Region::EndCapPlus, Region::Hep17]);

    let agg = monitor.aggregator().unwrap();
    let mut touched = 0;
    for (region, set) in agg.sets() {
        let expected = match region {
            None | Some(Region::EndCapPlus) | Some(Region::Hep17) => 1,
            Some(_) => 0,
        };
        for h in set.handles() {
            assert_eq!(h.entries(), expected, "{}", h.name());
            touched += h.entries();
        }
    }
    // 3 sets x 7 slots x (numerator + denominator)
    assert_eq!(touched, 42);
}

#[test]
fn region_histograms_are_named_per_region() {
    let mut monitor: JetMonitor = JetMonitor::new(JetMonitorConfig::default()).unwrap();
    let mut booker = Booker::new();
    monitor.on_run_start(1, &mut booker).unwrap();
    let paths: Vec<_> = booker.booked_paths().collect();
    for name in [
        "HLT/Jet/pfjetpT_numerator",
        "HLT/Jet/pfjetpT_pTThresh_HB_denominator",
        "HLT/Jet/pfjetpTVsLS_HF_numerator",
        "HLT/Jet/pfjetEtaVsPhi_HEM17_denominator",
        "HLT/Jet/pfjetEtaVspT_HEP18_numerator",
        "HLT/Jet/pfjetphi_HE_m_denominator",
    ] {
        assert!(paths.contains(&name), "{name} not booked");
    }
    // global + 7 regions, 7 slots, 2 phases
    assert_eq!(paths.len(), 8 * 7 * 2);
}

#[test]
fn widened_hep18_window_is_booked_and_routed_alike() {
    let mut cfg = JetMonitorConfig::default();
    cfg.regions.hep18_phi = BinningPSet::new(7, -0.60, -0.17);
    let mut monitor: JetMonitor = JetMonitor::new(cfg).unwrap();
    let mut booker = Booker::new();
    monitor.on_run_start(1, &mut booker).unwrap();

    let outcome = monitor.analyze(&event_with_jet(2.0, -0.55)).unwrap();
    assert_eq!(outcome.regions, vec![Region::EndCapPlus, Region::Hep17, Region::Hep18]);

    let agg = monitor.aggregator().unwrap();
    let hep18 = agg.region(Region::Hep18).unwrap();
    for h in hep18.handles() {
        assert_eq!(h.entries(), 1, "{}", h.name());
    }
}
